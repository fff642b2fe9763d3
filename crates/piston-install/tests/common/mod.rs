#![allow(dead_code)]

use piston_install::game::installer::config::InstallerConfig;
use piston_install::game::installer::core::store::sha1_hex;
use piston_install::game::installer::types::InstallLayout;
use piston_install::game::launcher::rules::{Environment, OsName};
use piston_install::game::version::ResolutionSession;
use serde_json::{json, Value};
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FOO_V1: &[u8] = b"foo v1.0";
pub const CLIENT_JAR: &[u8] = b"client jar bytes";
pub const SOUND: &[u8] = b"ogg ogg ogg";
pub const ICON: &[u8] = b"png";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Serve `body` at `route`, expecting exactly `times` requests
pub async fn serve(server: &MockServer, route: &str, body: &[u8], times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

pub async fn serve_status(server: &MockServer, route: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        zip.start_file::<&str, ()>(*name, zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn natives_jar() -> Vec<u8> {
    zip_bytes(&[
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0"),
        ("liblwjgl.so", b"elf"),
    ])
}

pub fn asset_index() -> Vec<u8> {
    json!({"objects": {
        "minecraft/sounds/a.ogg": {"hash": sha1_hex(SOUND), "size": SOUND.len()},
        "minecraft/sounds/a_again.ogg": {"hash": sha1_hex(SOUND), "size": SOUND.len()},
        "icons/icon.png": {"hash": sha1_hex(ICON), "size": ICON.len()}
    }})
    .to_string()
    .into_bytes()
}

/// A structured-arguments descriptor for `1.0` with one plain library, one
/// Windows-only library and one library with native classifiers
pub fn descriptor(base: &str, java_major: Option<u32>) -> Vec<u8> {
    let index = asset_index();
    let natives = natives_jar();
    let native_entry = |os: &str| {
        json!({
            "path": format!("org/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-{}.jar", os),
            "sha1": sha1_hex(&natives),
            "size": natives.len(),
            "url": format!("{}/libs/natives-{}.jar", base, os)
        })
    };

    let mut doc = json!({
        "arguments": {
            "game": ["--username", "${auth_player_name}"],
            "jvm": [{"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": ["-XstartOnFirstThread"]}]
        },
        "assetIndex": {
            "id": "1", "sha1": sha1_hex(&index), "size": index.len(), "totalSize": 14,
            "url": format!("{}/indexes/1.json", base)
        },
        "assets": "1",
        "downloads": {"client": {"sha1": sha1_hex(CLIENT_JAR), "size": CLIENT_JAR.len(), "url": format!("{}/client.jar", base)}},
        "id": "1.0",
        "libraries": [
            {"name": "com.example:foo:1.0",
             "downloads": {"artifact": {"path": "com/example/foo/1.0/foo-1.0.jar", "sha1": sha1_hex(FOO_V1), "size": FOO_V1.len(), "url": format!("{}/libs/foo-1.0.jar", base)}}},
            {"name": "com.example:winonly:2.0",
             "downloads": {"artifact": {"path": "com/example/winonly/2.0/winonly-2.0.jar", "sha1": sha1_hex(b"win"), "size": 3, "url": format!("{}/libs/winonly.jar", base)}},
             "rules": [{"action": "allow", "os": {"name": "windows"}}]},
            {"name": "org.lwjgl:lwjgl-platform:2.9.4",
             "natives": {"linux": "natives-linux", "osx": "natives-osx", "windows": "natives-windows"},
             "extract": {"exclude": ["META-INF/"]},
             "downloads": {"classifiers": {
                 "natives-linux": native_entry("linux"),
                 "natives-osx": native_entry("osx"),
                 "natives-windows": native_entry("windows")
             }}}
        ],
        "mainClass": "net.minecraft.client.main.Main",
        "releaseTime": "2020-01-01T00:00:00+00:00",
        "time": "2020-01-01T00:00:00+00:00",
        "type": "release"
    });
    if let Some(major) = java_major {
        doc["javaVersion"] = json!({"component": "jre", "majorVersion": major});
    }
    serde_json::to_vec_pretty(&doc).unwrap()
}

pub fn manifest(base: &str, descriptor: &[u8], runtimes: Value) -> Vec<u8> {
    json!({
        "latest": {"release": "1.0", "snapshot": "1.0"},
        "versions": [{
            "id": "1.0", "type": "release",
            "url": format!("{}/versions/1.0.json", base),
            "sha1": sha1_hex(descriptor),
            "time": "2020-01-01T00:00:00+00:00",
            "releaseTime": "2020-01-01T00:00:00+00:00"
        }],
        "javaRuntimes": runtimes
    })
    .to_string()
    .into_bytes()
}

pub fn config(base: &str, patching: bool) -> InstallerConfig {
    InstallerConfig {
        manifest_url: format!("{}/manifest.json", base),
        patch_base_url: format!("{}/patch", base),
        asset_base_url: format!("{}/objects", base),
        concurrency: 4,
        patching,
        ..Default::default()
    }
}

pub fn linux() -> Environment {
    Environment::new(OsName::Linux, "x86_64")
}

pub fn session(base: &str, root: &std::path::Path, patching: bool) -> ResolutionSession {
    ResolutionSession::with_client(
        reqwest::Client::new(),
        config(base, patching),
        InstallLayout::new(root),
        linux(),
    )
}

/// Object-store route for an asset, `/objects/<hh>/<hash>`
pub fn object_route(bytes: &[u8]) -> String {
    let hash = sha1_hex(bytes);
    format!("/objects/{}/{}", &hash[..2], hash)
}
