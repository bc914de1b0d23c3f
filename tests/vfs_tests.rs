//! Integration tests for the VFS router, mounts and permissions.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use umbra_pak::config::KdfParams;
use umbra_pak::crypto::Secret;
use umbra_pak::error::{Error, Result};
use umbra_pak::pak::PakWriter;
use umbra_pak::vfs::{Mount, Permissions, Vfs};

const FAST: KdfParams = KdfParams::testing();

fn test_secret() -> Secret {
    Secret::from_bytes(vec![0x17u8; 32])
}

/// Write a small source archive and return its path.
fn source_pak(dir: &Path, secret: &Secret) -> std::path::PathBuf {
    let out = dir.join("src.pak");
    let mut writer = PakWriter::with_params(&out, secret, dir, FAST).expect("Failed to create writer");
    writer.add_bytes("main.lua", b"print('hi')").unwrap();
    writer.add_bytes("lib/util.lua", b"return {}").unwrap();
    writer.finish().expect("Failed to finish archive");
    out
}

fn is_denied<T>(result: Result<T>) -> bool {
    matches!(result, Err(Error::PermissionDenied { .. }))
}

#[test]
fn test_data_only_vfs_has_no_assets() {
    let temp_dir = TempDir::new().unwrap();
    let mut vfs = Vfs::new();
    vfs.mount(
        "data://",
        Mount::directory(
            temp_dir.path(),
            Permissions::READ | Permissions::WRITE | Permissions::CREATE,
        )
        .unwrap(),
    )
    .unwrap();

    assert!(matches!(vfs.read("assets://x"), Err(Error::MountNotFound(_))));
    assert!(!vfs.exists("assets://x").unwrap());
}

#[test]
fn test_data_directory_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let mut vfs = Vfs::new();
    vfs.mount(
        "data://",
        Mount::directory(&temp_dir.path().join("data"), Permissions::READ_WRITE).unwrap(),
    )
    .unwrap();

    vfs.create("data://save.json").unwrap();
    vfs.write("data://save.json", b"{\"level\":2}").unwrap();
    assert_eq!(vfs.read("data://save.json").unwrap(), b"{\"level\":2}");
    assert_eq!(vfs.list("data://").unwrap(), vec!["save.json"]);

    assert!(matches!(
        vfs.create("data://save.json"),
        Err(Error::PathExists(_))
    ));

    vfs.remove("data://save.json").unwrap();
    assert!(!vfs.exists("data://save.json").unwrap());
    assert!(matches!(
        vfs.write("data://save.json", b"x"),
        Err(Error::FileNotFound(_))
    ));

    // The directory on disk holds what the VFS wrote.
    assert!(temp_dir.path().join("data").is_dir());
}

#[test]
fn test_directory_mount_without_bits_refuses_everything() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("keep.txt"), b"keep").unwrap();

    let mut vfs = Vfs::new();
    vfs.mount(
        "ro://",
        Mount::directory(temp_dir.path(), Permissions::READ).unwrap(),
    )
    .unwrap();

    assert_eq!(vfs.read("ro://keep.txt").unwrap(), b"keep");
    assert!(is_denied(vfs.write("ro://keep.txt", b"changed")));
    assert!(is_denied(vfs.remove("ro://keep.txt")));
    assert!(is_denied(vfs.create("ro://new.txt")));
    assert!(is_denied(vfs.list("ro://")));
    assert!(is_denied(vfs.execute("ro://keep.txt")));

    assert_eq!(fs::read(temp_dir.path().join("keep.txt")).unwrap(), b"keep");
    assert!(!temp_dir.path().join("new.txt").exists());
}

#[test]
fn test_every_missing_bit_denies() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("f"), b"data").unwrap();

    let all = [
        Permissions::READ,
        Permissions::WRITE,
        Permissions::CREATE,
        Permissions::REMOVE,
        Permissions::LIST,
        Permissions::EXECUTE,
    ];

    for missing in all {
        let granted = Permissions::all().difference(missing);
        let mount = Mount::directory(temp_dir.path(), granted).unwrap();
        let executor = |_: &[u8], _: &str| -> Result<()> { Ok(()) };

        let denied = match missing {
            m if m == Permissions::READ => {
                is_denied(mount.read("f")) && is_denied(mount.exists("f"))
            }
            m if m == Permissions::WRITE => is_denied(mount.write("f", b"x")),
            m if m == Permissions::CREATE => is_denied(mount.create("g")),
            m if m == Permissions::REMOVE => is_denied(mount.remove("f")),
            m if m == Permissions::LIST => is_denied(mount.list("")),
            _ => is_denied(mount.execute("f", &executor)),
        };
        assert!(denied, "missing {missing:?} was not enforced");
    }

    assert_eq!(fs::read(temp_dir.path().join("f")).unwrap(), b"data");
}

#[test]
fn test_pak_mount_is_read_only_even_with_write_bits() {
    let temp_dir = TempDir::new().unwrap();
    let secret = test_secret();
    let pak = source_pak(temp_dir.path(), &secret);

    let mut vfs = Vfs::new();
    vfs.mount(
        "src://",
        Mount::pak_with_params(&pak, &secret, Permissions::all(), FAST).unwrap(),
    )
    .unwrap();

    assert_eq!(vfs.read("src://main.lua").unwrap(), b"print('hi')");
    assert!(matches!(
        vfs.write("src://main.lua", b"x"),
        Err(Error::Unsupported { .. })
    ));
    assert!(matches!(
        vfs.create("src://new.lua"),
        Err(Error::Unsupported { .. })
    ));
    assert!(matches!(
        vfs.remove("src://main.lua"),
        Err(Error::Unsupported { .. })
    ));
}

#[test]
fn test_pak_mount_listing() {
    let temp_dir = TempDir::new().unwrap();
    let secret = test_secret();
    let pak = source_pak(temp_dir.path(), &secret);

    let mut vfs = Vfs::new();
    vfs.mount(
        "src://",
        Mount::pak_with_params(&pak, &secret, Permissions::READ | Permissions::LIST, FAST)
            .unwrap(),
    )
    .unwrap();

    assert_eq!(
        vfs.list("src://").unwrap(),
        vec!["lib/util.lua", "main.lua"]
    );
    assert_eq!(vfs.list("src://lib").unwrap(), vec!["lib/util.lua"]);
    assert!(vfs.exists("src://lib/util.lua").unwrap());
    assert!(!vfs.exists("src://lib").unwrap());
}

#[test]
fn test_execute_through_router() {
    let temp_dir = TempDir::new().unwrap();
    let secret = test_secret();
    let pak = source_pak(temp_dir.path(), &secret);

    let mut vfs = Vfs::new();
    vfs.mount(
        "src://",
        Mount::pak_with_params(
            &pak,
            &secret,
            Permissions::READ | Permissions::EXECUTE,
            FAST,
        )
        .unwrap(),
    )
    .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    vfs.set_executor(move |source: &[u8], label: &str| -> Result<()> {
        sink.lock()
            .unwrap()
            .push((label.to_string(), String::from_utf8_lossy(source).into_owned()));
        Ok(())
    });

    vfs.execute("src://main.lua").unwrap();
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[("main.lua".to_string(), "print('hi')".to_string())]
    );

    assert!(matches!(
        vfs.execute("src://missing.lua"),
        Err(Error::FileNotFound(_))
    ));
}

#[test]
fn test_executor_error_propagates() {
    let temp_dir = TempDir::new().unwrap();
    let secret = test_secret();
    let pak = source_pak(temp_dir.path(), &secret);

    let mut vfs = Vfs::new();
    vfs.mount(
        "src://",
        Mount::pak_with_params(&pak, &secret, Permissions::EXECUTE, FAST).unwrap(),
    )
    .unwrap();
    vfs.set_executor(|_: &[u8], label: &str| -> Result<()> {
        Err(Error::Script {
            path: label.to_string(),
            message: "syntax error".to_string(),
        })
    });

    assert!(matches!(
        vfs.execute("src://main.lua"),
        Err(Error::Script { .. })
    ));
}

#[test]
fn test_wrong_secret_mount_reads_fail_authentication() {
    let temp_dir = TempDir::new().unwrap();
    let pak = source_pak(temp_dir.path(), &test_secret());

    let mut vfs = Vfs::new();
    vfs.mount(
        "src://",
        Mount::pak_with_params(
            &pak,
            &Secret::from_bytes(vec![0x99u8; 32]),
            Permissions::READ,
            FAST,
        )
        .unwrap(),
    )
    .unwrap();

    assert!(vfs
        .read("src://main.lua")
        .unwrap_err()
        .is_authentication_failure());
}

#[test]
fn test_directory_mount_rejects_escape() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("outside.txt"), b"no").unwrap();

    let mut vfs = Vfs::new();
    vfs.mount(
        "data://",
        Mount::directory(&temp_dir.path().join("data"), Permissions::READ_WRITE).unwrap(),
    )
    .unwrap();

    assert!(matches!(
        vfs.read("data://../outside.txt"),
        Err(Error::InvalidPath(_))
    ));
}
