use crate::{
    chain::FaucetChain,
    error::{
        FaucetError,
        FaucetResult,
    },
};
use alloy::{
    primitives::Address,
    signers::local::{
        MnemonicBuilder,
        PrivateKeySigner,
        coins_bip39::English,
    },
};
use eth_keystore::decrypt_key;
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
};
use tracing::info;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalletSource {
    /// Encrypted JSON keystores, as written by `cast wallet import`.
    Keystore { dir: PathBuf, name: Option<String> },
    /// Accounts the node itself has unlocked.
    NodeAccounts,
}

#[derive(Clone, Debug, Eq, PartialEq)]
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

pub const DEFAULT_KEYSTORE_DIR: &str = "~/.foundry/keystores";

/// Tilde-expands `dir`, falling back to [`DEFAULT_KEYSTORE_DIR`].
pub fn resolve_keystore_dir(dir: Option<&str>) -> PathBuf {
    let raw = dir.unwrap_or(DEFAULT_KEYSTORE_DIR);
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

pub fn list_wallets(dir: &Path) -> FaucetResult<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|e| {
        FaucetError::WalletUnavailable(format!(
            "failed to read keystore directory {}: {e}",
            dir.display()
        ))
    })?;
    let mut wallets = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }
        let name = file_name.trim_end_matches(".json").to_owned();
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

/// Picks the named keystore, or the first one in name order.
pub fn find_wallet(dir: &Path, name: Option<&str>) -> FaucetResult<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    match name {
        Some(name) => wallets.into_iter().find(|w| w.name == name).ok_or_else(|| {
            FaucetError::WalletUnavailable(format!(
                "keystore '{name}' not found in {}",
                dir.display()
            ))
        }),
        None => wallets.into_iter().next().ok_or_else(|| {
            FaucetError::WalletUnavailable(format!(
                "no keystore found in {}; import one or use --node-accounts",
                dir.display()
            ))
        }),
    }
}

/// `password` is `None` when the user dismissed the prompt.
pub fn unlock_wallet(
    descriptor: &WalletDescriptor,
    password: Option<&str>,
) -> FaucetResult<PrivateKeySigner> {
    let password = password.ok_or(FaucetError::UserRejected)?;
    let secret = decrypt_key(&descriptor.path, password.as_bytes()).map_err(|_| {
        FaucetError::WalletLocked(format!(
            "invalid password for keystore '{}'",
            descriptor.name
        ))
    })?;

    if let Ok(signer) = PrivateKeySigner::from_slice(&secret) {
        return Ok(signer);
    }

    if let Ok(mnemonic) = std::str::from_utf8(&secret) {
        let word_count = mnemonic.split_whitespace().count();
        if word_count >= 12 {
            let signer = MnemonicBuilder::<English>::default()
                .phrase(mnemonic.trim())
                .index(0u32)
                .and_then(|builder| builder.build())
                .map_err(|e| FaucetError::WalletLocked(e.to_string()))?;
            return Ok(signer);
        }
    }

    Err(FaucetError::WalletLocked(format!(
        "keystore '{}' contained unsupported key material",
        descriptor.name
    )))
}

/// Who signs transactions for the session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SigningIdentity {
    Keystore { name: String, address: Address },
    NodeAccount(Address),
}

impl SigningIdentity {
    pub fn address(&self) -> Address {
        match self {
            SigningIdentity::Keystore { address, .. } => *address,
            SigningIdentity::NodeAccount(address) => *address,
        }
    }
}

impl fmt::Display for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningIdentity::Keystore { name, .. } => write!(f, "keystore '{name}'"),
            SigningIdentity::NodeAccount(_) => write!(f, "node account"),
        }
    }
}

pub struct Session<C> {
    chain: Arc<C>,
    identity: SigningIdentity,
    connected_address: Address,
}

impl<C> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            identity: self.identity.clone(),
            connected_address: self.connected_address,
        }
    }
}

impl<C: FaucetChain> Session<C> {
    /// Requests the wallet's accounts and adopts the first one.
    ///
    /// `keystore` names the unlocked keystore, if the chain signs with one.
    pub async fn establish(chain: Arc<C>, keystore: Option<&str>) -> FaucetResult<Self> {
        let accounts = chain.request_accounts().await?;
        let Some(first) = accounts.first().copied() else {
            return Err(FaucetError::WalletUnavailable(String::from(
                "wallet exposed no accounts",
            )));
        };
        let identity = match keystore {
            Some(name) => SigningIdentity::Keystore {
                name: name.to_owned(),
                address: first,
            },
            None => SigningIdentity::NodeAccount(first),
        };
        info!(address = %first, %identity, "wallet connected");
        Ok(Self {
            chain,
            identity,
            connected_address: first,
        })
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    pub fn connected_address(&self) -> Address {
        self.connected_address
    }
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("connected_address", &self.connected_address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn find_wallet__missing_directory_is_wallet_unavailable() {
        // given
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        // when
        let result = find_wallet(&missing, None);

        // then
        assert!(matches!(result, Err(FaucetError::WalletUnavailable(_))));
    }

    #[test]
    fn find_wallet__empty_directory_is_wallet_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = find_wallet(dir.path(), None);
        assert!(matches!(result, Err(FaucetError::WalletUnavailable(_))));
    }

    #[test]
    fn find_wallet__defaults_to_first_keystore_by_name() {
        // given
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zed"), b"{}").unwrap();
        fs::write(dir.path().join("alice.json"), b"{}").unwrap();
        fs::write(dir.path().join(".hidden"), b"{}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        // when
        let wallet = find_wallet(dir.path(), None).unwrap();

        // then
        assert_eq!(wallet.name, "alice");
        assert_eq!(list_wallets(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn find_wallet__unknown_name_is_wallet_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("alice"), b"{}").unwrap();
        let result = find_wallet(dir.path(), Some("bob"));
        assert!(matches!(result, Err(FaucetError::WalletUnavailable(_))));
    }

    #[test]
    fn unlock_wallet__dismissed_prompt_is_user_rejected() {
        // given
        let descriptor = WalletDescriptor::new("alice", PathBuf::from("/nonexistent"));

        // when
        let result = unlock_wallet(&descriptor, None);

        // then
        assert_eq!(result.unwrap_err(), FaucetError::UserRejected);
    }

    #[test]
    fn unlock_wallet__unreadable_keystore_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice");
        fs::write(&path, b"not a keystore").unwrap();
        let descriptor = WalletDescriptor::new("alice", path);
        let result = unlock_wallet(&descriptor, Some("hunter2"));
        assert!(matches!(result, Err(FaucetError::WalletLocked(_))));
    }

    #[test]
    fn resolve_keystore_dir__expands_explicit_path() {
        let dir = resolve_keystore_dir(Some("/tmp/keys"));
        assert_eq!(dir, PathBuf::from("/tmp/keys"));
    }

    #[test]
    fn resolve_keystore_dir__default_goes_through_tilde_expansion() {
        // given
        let expected = PathBuf::from(shellexpand::tilde("~/.foundry/keystores").into_owned());

        // when
        let dir = resolve_keystore_dir(None);

        // then
        assert_eq!(dir, expected);
        assert!(dir.ends_with(".foundry/keystores"));
        if home_is_set() {
            assert!(!dir.starts_with("~"));
        }
    }

    fn home_is_set() -> bool {
        std::env::var_os("HOME").is_some_and(|home| !home.is_empty())
    }
}
