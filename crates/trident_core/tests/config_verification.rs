//! # Config Verification Tests
//!
//! TOML configuration drives every constructor; bad files are rejected with
//! `InvalidConfig` before anything is built.
//!
//! Run with: cargo test --test config_verification

use std::path::PathBuf;

use trident_core::{
    CompleteBinarySearchTree, NamedRegistry, PagedArray, StorageConfig, StorageError,
    TransactionMode::ReadOnly, TripleBuffer,
};

fn write_temp(name: &str, text: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("trident_{}_{name}.toml", std::process::id()));
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn verify_file_config_drives_constructors() {
    let path = write_temp(
        "valid",
        "page_power = 4\ninitial_page_count = 2\nhash_size = 13\ninitial_capacity = 16\n",
    );
    let config = StorageConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let paged: PagedArray<u8> = PagedArray::with_config(&config);
    assert_eq!(paged.page_size(), 16);
    assert_eq!(paged.len(), 16);

    let registry: NamedRegistry<u8> = NamedRegistry::with_config(&config);
    assert_eq!(registry.capacity(), 16);
    assert_eq!(registry.hash_size(), 13);

    let buffer: TripleBuffer<u8> = TripleBuffer::with_config(&config);
    assert_eq!(buffer.len(ReadOnly), 16);

    let tree: CompleteBinarySearchTree<u8> = CompleteBinarySearchTree::with_config(&config);
    assert!(tree.is_empty());
}

#[test]
fn verify_partial_file_uses_defaults() {
    let config = StorageConfig::from_toml_str("hash_size = 101").unwrap();
    assert_eq!(config.hash_size, 101);
    assert_eq!(config.page_power, StorageConfig::default().page_power);
    assert_eq!(config.initial_capacity, 64);
}

#[test]
fn verify_invalid_configs_are_rejected() {
    for text in [
        "page_power = 0",
        "page_power = 40",
        "hash_size = 0",
        "initial_page_count = 0",
        "initial_capacity = 0",
        "page_size = 256",
        "page_power = \"eight\"",
    ] {
        assert!(
            matches!(StorageConfig::from_toml_str(text), Err(StorageError::InvalidConfig(_))),
            "accepted {text:?}"
        );
    }
}

#[test]
fn verify_missing_file_is_an_error() {
    let path = std::env::temp_dir().join("trident_definitely_missing_config.toml");
    let err = StorageConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, StorageError::InvalidConfig(_)));
}
