//! A fake Mojang/Fabric backend for end-to-end installs.

#![allow(dead_code)]

use piston_install::game::profile::{OsName, Platform};
use piston_install::utils::fs::sha1_hex;
use piston_install::InstallSpec;
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

pub const MC: &str = "1.20.1";
pub const CLIENT: &[u8] = b"client jar bytes";
pub const GUAVA: &[u8] = b"guava jar bytes";
pub const ASM: &[u8] = b"vanilla asm 9.3";
pub const LOG_CONFIG: &[u8] = b"<Configuration/>";
pub const FABRIC_LOADER: &[u8] = b"fabric loader jar";
pub const FABRIC_ASM: &[u8] = b"fabric asm 9.7";

/// Virtual path -> content. Two paths share one object.
pub const ASSETS: &[(&str, &[u8])] = &[
    ("minecraft/lang/en_us.json", b"{\"menu.play\": \"Play\"}"),
    ("minecraft/sounds/click.ogg", b"click"),
    ("minecraft/sounds/click_copy.ogg", b"click"),
];

pub const GUAVA_PATH: &str = "com/google/guava/guava/31.1-jre/guava-31.1-jre.jar";
pub const ASM_PATH: &str = "org/ow2/asm/asm/9.3/asm-9.3.jar";
pub const NATIVES_PATH: &str = "org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub async fn mount(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

pub fn asset_route(content: &[u8]) -> String {
    let hash = sha1_hex(content);
    format!("/res/{}/{}", &hash[..2], hash)
}

pub fn natives_jar() -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in [
        ("liblwjgl.so", b"elf".as_slice()),
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0".as_slice()),
    ] {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn artifact(uri: &str, path: &str, body: &[u8]) -> Value {
    json!({
        "path": path,
        "sha1": sha1_hex(body),
        "size": body.len(),
        "url": format!("{}/libraries/{}", uri, path),
    })
}

pub fn asset_index() -> String {
    let objects: serde_json::Map<String, Value> = ASSETS
        .iter()
        .map(|(name, body)| {
            (
                name.to_string(),
                json!({"hash": sha1_hex(body), "size": body.len()}),
            )
        })
        .collect();
    json!({ "objects": objects }).to_string()
}

pub fn vanilla_json(uri: &str) -> String {
    let index = asset_index();
    let natives = natives_jar();
    json!({
        "id": MC,
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "releaseTime": "2023-06-12T13:25:51+00:00",
        "arguments": {
            "game": ["--username", "${auth_player_name}", "--version", "${version_name}"],
            "jvm": ["-Djava.library.path=${natives_directory}", "-cp", "${classpath}"]
        },
        "assetIndex": {
            "id": "5",
            "sha1": sha1_hex(index.as_bytes()),
            "size": index.len(),
            "url": format!("{}/indexes/5.json", uri)
        },
        "assets": "5",
        "downloads": {
            "client": {"sha1": sha1_hex(CLIENT), "size": CLIENT.len(), "url": format!("{}/client.jar", uri)}
        },
        "logging": {
            "client": {
                "argument": "-Dlog4j.configurationFile=${path}",
                "file": {
                    "id": "client-1.12.xml",
                    "sha1": sha1_hex(LOG_CONFIG),
                    "size": LOG_CONFIG.len(),
                    "url": format!("{}/log/client-1.12.xml", uri)
                },
                "type": "log4j2-xml"
            }
        },
        "libraries": [
            {"name": "com.google.guava:guava:31.1-jre",
             "downloads": {"artifact": artifact(uri, GUAVA_PATH, GUAVA)}},
            {"name": "org.ow2.asm:asm:9.3",
             "downloads": {"artifact": artifact(uri, ASM_PATH, ASM)}},
            {"name": "com.example:mac-only:1.0",
             "downloads": {"artifact": artifact(uri, "com/example/mac-only/1.0/mac-only-1.0.jar", b"mac")},
             "rules": [{"action": "allow", "os": {"name": "osx"}}]},
            {"name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
             "natives": {"linux": "natives-linux", "osx": "natives-osx", "windows": "natives-windows"},
             "extract": {"exclude": ["META-INF/"]},
             "downloads": {"classifiers": {
                 "natives-linux": artifact(uri, NATIVES_PATH, &natives)
             }}}
        ]
    })
    .to_string()
}

/// Mount the catalog, the 1.20.1 version JSON and every file it needs.
pub async fn serve_vanilla(server: &MockServer) {
    serve_vanilla_json(server, vanilla_json(&server.uri())).await;
}

/// Like [`serve_vanilla`], with `version` as the 1.20.1 version JSON.
pub async fn serve_vanilla_json(server: &MockServer, version: String) {
    let uri = server.uri();
    let catalog = json!({
        "latest": {"release": MC, "snapshot": MC},
        "versions": [{
            "id": MC,
            "type": "release",
            "url": format!("{}/v/{}.json", uri, MC),
            "sha1": sha1_hex(version.as_bytes()),
            "releaseTime": "2023-06-12T13:25:51+00:00"
        }]
    })
    .to_string();

    mount(server, "/manifest.json", catalog.into_bytes()).await;
    mount(server, &format!("/v/{}.json", MC), version.into_bytes()).await;
    mount(server, "/indexes/5.json", asset_index().into_bytes()).await;
    mount(server, "/client.jar", CLIENT.to_vec()).await;
    mount(server, "/log/client-1.12.xml", LOG_CONFIG.to_vec()).await;
    mount(server, &format!("/libraries/{}", GUAVA_PATH), GUAVA.to_vec()).await;
    mount(server, &format!("/libraries/{}", ASM_PATH), ASM.to_vec()).await;
    mount(server, &format!("/libraries/{}", NATIVES_PATH), natives_jar()).await;
    for (_, body) in ASSETS {
        mount(server, &asset_route(body), body.to_vec()).await;
    }
}

pub const FABRIC_ID: &str = "fabric-loader-0.16.5-1.20.1";

/// Mount the Fabric meta endpoints and loader maven.
pub async fn serve_fabric(server: &MockServer) {
    let uri = server.uri();
    let loaders = json!([
        {"loader": {"version": "0.16.6-beta.1", "stable": false}},
        {"loader": {"version": "0.16.5", "stable": true}}
    ])
    .to_string();
    let profile = json!({
        "id": FABRIC_ID,
        "inheritsFrom": MC,
        "type": "release",
        "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
        "arguments": {"game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]},
        "libraries": [
            {"name": "org.ow2.asm:asm:9.7", "sha1": sha1_hex(FABRIC_ASM), "size": FABRIC_ASM.len()},
            {"name": "net.fabricmc:fabric-loader:0.16.5", "sha1": sha1_hex(FABRIC_LOADER), "size": FABRIC_LOADER.len()}
        ]
    })
    .to_string();

    mount(server, &format!("/fabric/versions/loader/{}", MC), loaders.into_bytes()).await;
    mount(
        server,
        &format!("/fabric/versions/loader/{}/0.16.5/profile/json", MC),
        profile.into_bytes(),
    )
    .await;
    mount(server, "/fabric-maven/org/ow2/asm/asm/9.7/asm-9.7.jar", FABRIC_ASM.to_vec()).await;
    mount(
        server,
        "/fabric-maven/net/fabricmc/fabric-loader/0.16.5/fabric-loader-0.16.5.jar",
        FABRIC_LOADER.to_vec(),
    )
    .await;
}

/// An install spec pointed at `server`, for a Linux x86_64 machine.
pub fn spec(server: &MockServer, dir: &Path) -> InstallSpec {
    let uri = server.uri();
    let mut spec = InstallSpec::new(MC, dir.join("data"), dir.join("game"));
    spec.platform = Some(Platform::new(OsName::Linux, "6.1", "x86_64"));
    spec.config.endpoints.version_manifest = format!("{}/manifest.json", uri);
    spec.config.endpoints.resources = format!("{}/res", uri);
    spec.config.endpoints.libraries = format!("{}/libraries/", uri);
    spec.config.endpoints.fabric_meta = format!("{}/fabric", uri);
    spec.config.endpoints.fabric_maven = format!("{}/fabric-maven/", uri);
    spec.config.endpoints.java_runtimes = format!("{}/runtimes/all.json", uri);
    spec.config.concurrency = 4;
    spec.config.backoff_base_ms = 1;
    spec.config.backoff_max_ms = 5;
    spec
}

/// Every regular file below `dir`.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}
