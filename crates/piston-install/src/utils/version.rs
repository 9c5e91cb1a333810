//! Ordering for loader build numbers such as `47.2.0`, `0.16.5` or
//! `10.13.4.1614`.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Part<'a> {
    Numeric(u64),
    Text(&'a str),
}

fn parts(s: &str) -> Vec<Part<'_>> {
    s.split(['.', '-', '+'])
        .filter(|p| !p.is_empty())
        .map(|p| p.parse().map(Part::Numeric).unwrap_or(Part::Text(p)))
        .collect()
}

/// Compare two build versions segment by segment. A pre-release tag after
/// `-` sorts before the untagged build (`1.0.0-beta.1 < 1.0.0`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_base, a_tag) = a.split_once('-').map_or((a, None), |(b, t)| (b, Some(t)));
    let (b_base, b_tag) = b.split_once('-').map_or((b, None), |(b, t)| (b, Some(t)));

    parts(a_base).cmp(&parts(b_base)).then_with(|| match (a_tag, b_tag) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(at), Some(bt)) => parts(at).cmp(&parts(bt)),
    })
}

/// The highest version in `versions`.
pub fn newest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}
