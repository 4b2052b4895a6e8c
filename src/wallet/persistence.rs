use crate::richlist::RichlistError;
use crate::wallet::Wallet;

use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Repository for durable wallet records
#[async_trait::async_trait]
pub trait WalletRepository {
	async fn save(&self, wallet: &Wallet) -> Result<(), RichlistError>;
	async fn load_all(&self) -> Result<Vec<Wallet>, RichlistError>;
}

/// File-based implementation of WalletRepository: one `<address>.json` per wallet
pub struct FileWalletRepository {
	data_dir: PathBuf,
}

impl FileWalletRepository {
	/// Open the repository, creating the data directory if needed.
	pub async fn create(data_dir: PathBuf) -> Result<Self, RichlistError> {
		tokio::fs::create_dir_all(&data_dir).await.map_err(|e| {
			RichlistError::Persistence(format!(
				"Failed to create wallet directory {:?}: {}",
				data_dir, e
			))
		})?;
		Ok(Self { data_dir })
	}

	/// Record path for `address`; addresses that could escape the data directory are rejected.
	fn get_wallet_filename(&self, address: &str) -> Result<PathBuf, RichlistError> {
		if address.is_empty()
			|| address.contains(['/', '\\'])
			|| address.contains("..")
		{
			return Err(RichlistError::Persistence(format!(
				"Refusing to store wallet with unsafe address {:?}",
				address
			)));
		}
		Ok(self.data_dir.join(format!("{}.json", address)))
	}

	async fn read_wallet(path: &Path) -> Result<Wallet, RichlistError> {
		let content = tokio::fs::read_to_string(path).await?;
		serde_json::from_str(&content).map_err(|e| {
			RichlistError::Persistence(format!("Failed to parse wallet file {:?}: {}", path, e))
		})
	}
}

#[async_trait::async_trait]
impl WalletRepository for FileWalletRepository {
	async fn save(&self, wallet: &Wallet) -> Result<(), RichlistError> {
		let content = serde_json::to_string_pretty(wallet).map_err(|e| {
			RichlistError::Persistence(format!("Failed to serialize wallet: {}", e))
		})?;

		// Write beside the target and rename so a crash never leaves a torn record
		let filename = self.get_wallet_filename(&wallet.address)?;
		let tmp_filename = filename.with_extension("json.tmp");
		tokio::fs::write(&tmp_filename, content)
			.await
			.map_err(|e| {
				RichlistError::Persistence(format!("Failed to write wallet file: {}", e))
			})?;
		tokio::fs::rename(&tmp_filename, &filename)
			.await
			.map_err(|e| {
				RichlistError::Persistence(format!("Failed to replace wallet file: {}", e))
			})?;

		Ok(())
	}

	async fn load_all(&self) -> Result<Vec<Wallet>, RichlistError> {
		let mut entries = tokio::fs::read_dir(&self.data_dir).await.map_err(|e| {
			RichlistError::Persistence(format!("Failed to read directory: {}", e))
		})?;

		let mut paths = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(|e| {
			RichlistError::Persistence(format!("Failed to read directory entry: {}", e))
		})? {
			let path = entry.path();
			if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
				paths.push(path);
			}
		}
		// Directory order is unspecified; sort for a stable registry order across restarts
		paths.sort();

		let mut wallets = Vec::with_capacity(paths.len());
		for path in paths {
			match Self::read_wallet(&path).await {
				Ok(wallet) => wallets.push(wallet),
				Err(e) => warn!("Skipping unreadable wallet record {:?}: {}", path, e),
			}
		}

		info!(
			"Loaded {} wallet records from {:?}",
			wallets.len(),
			self.data_dir
		);
		Ok(wallets)
	}
}
