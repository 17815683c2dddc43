//! Local keystore management for the demo binary.
//!
//! Wallets are standard encrypted JSON keystores. The account address is
//! taken from the keystore's `address` field; the key is never decrypted,
//! since the in-process chain signs for the connected account itself.

use alloy_primitives::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::Deserialize;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".flipquest").join("wallets"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read wallet directory")? {
        let entry = entry.wrap_err("Failed to read wallet entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid wallet filename {:?}", path))?
            .to_owned();
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    wallets
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| eyre!("Wallet '{name}' not found in {}", dir.to_string_lossy()))
}

#[derive(Deserialize)]
struct KeystoreAddress {
    address: String,
}

/// Reads the account address without decrypting the key.
pub fn wallet_address(descriptor: &WalletDescriptor) -> Result<Address> {
    let raw = fs::read_to_string(&descriptor.path)
        .wrap_err_with(|| format!("Failed to read wallet '{}'", descriptor.name))?;
    let keystore: KeystoreAddress = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Wallet '{}' is not a keystore", descriptor.name))?;
    let padded = format!("0x{}", keystore.address.trim_start_matches("0x"));
    Address::from_str(&padded)
        .map_err(|_| eyre!("Wallet '{}' has an invalid address", descriptor.name))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn list_wallets__missing_dir_is_empty() {
        // given
        let dir = PathBuf::from("/definitely/not/here");

        // when
        let wallets = list_wallets(&dir).unwrap();

        // then
        assert!(wallets.is_empty());
    }

    #[test]
    fn list_wallets__only_json_files_sorted_by_name() {
        // given
        let dir = TempDir::new("wallets").unwrap();
        fs::write(dir.path().join("zeta.json"), "{}").unwrap();
        fs::write(dir.path().join("alpha.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        // when
        let wallets = list_wallets(dir.path()).unwrap();

        // then
        let names: Vec<_> = wallets.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn wallet_address__reads_unprefixed_keystore_address() {
        // given
        let dir = TempDir::new("wallets").unwrap();
        let path = dir.path().join("demo.json");
        fs::write(
            &path,
            r#"{"address": "00000000000000000000000000000000000000aa", "crypto": {}}"#,
        )
        .unwrap();

        // when
        let address = wallet_address(&WalletDescriptor::new("demo", path)).unwrap();

        // then
        let expected =
            Address::from_str("0x00000000000000000000000000000000000000aa").unwrap();
        assert_eq!(address, expected);
    }

    #[test]
    fn find_wallet__unknown_name_errors() {
        // given
        let dir = TempDir::new("wallets").unwrap();

        // when
        let result = find_wallet(dir.path(), "ghost");

        // then
        assert!(result.is_err());
    }
}
