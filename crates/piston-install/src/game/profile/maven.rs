use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maven coordinate: `group:artifact:version[:classifier][@extension]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MavenCoordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid Maven coordinates: {0}")]
pub struct InvalidCoordinate(pub String);

impl MavenCoordinate {
    /// Key used to decide whether two entries denote the same library:
    /// `group:artifact[:classifier]`, version excluded.
    pub fn dedup_key(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}:{}:{}", self.group, self.artifact, c),
            None => format!("{}:{}", self.group, self.artifact),
        }
    }

    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact, self.version, c, self.extension),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }

    /// Repository-relative path, always with `/` separators.
    /// `com.google.guava:guava:21.0` -> `com/google/guava/guava/21.0/guava-21.0.jar`
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.file_name()
        )
    }

    /// Same coordinate with a different classifier (used for natives).
    pub fn with_classifier(&self, classifier: &str) -> Self {
        Self {
            classifier: Some(classifier.to_string()),
            ..self.clone()
        }
    }

    /// Full URL of this artifact inside the repository at `base`.
    pub fn url_in(&self, base: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, self.path())
        } else {
            format!("{}/{}", base, self.path())
        }
    }
}

impl FromStr for MavenCoordinate {
    type Err = InvalidCoordinate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (coords, extension) = match s.split_once('@') {
            Some((c, ext)) if !ext.is_empty() => (c, ext.to_string()),
            Some(_) => return Err(InvalidCoordinate(s.to_string())),
            None => (s, "jar".to_string()),
        };
        let parts: Vec<&str> = coords.split(':').collect();
        if !(3..=4).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
            return Err(InvalidCoordinate(s.to_string()));
        }
        Ok(Self {
            group: parts[0].to_string(),
            artifact: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier: parts.get(3).map(|c| c.to_string()),
            extension,
        })
    }
}

impl TryFrom<String> for MavenCoordinate {
    type Error = InvalidCoordinate;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MavenCoordinate> for String {
    fn from(value: MavenCoordinate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}
