//! Extracts the name and file listing from raw .torrent bytes.

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};

use super::TorrentMetadata;
use crate::engine::EngineError;
use crate::infohash::InfoHash;

/// What identifies an uploaded .torrent file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentIdentity {
    pub info_hash: InfoHash,
    pub name: Option<String>,
}

/// Infohash (SHA-1 of the bencoded info dictionary) and name of a .torrent file.
pub fn parse_torrent_identity(bytes: &[u8]) -> Result<TorrentIdentity, EngineError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| EngineError::Metadata(e.to_string()))?;

    let name = torrent
        .info
        .name
        .as_ref()
        .map(|b| bytes_to_string(b.as_ref()))
        .filter(|n| !n.trim().is_empty());

    Ok(TorrentIdentity {
        info_hash: InfoHash::from_bytes(torrent.info_hash.0),
        name,
    })
}

/// Parse bencoded torrent bytes into [`TorrentMetadata`].
///
/// Multi-file torrents list each file as `name/dir/file`. Single-file torrents
/// list the torrent name as their only file.
pub fn parse_torrent_metadata(bytes: &[u8]) -> Result<TorrentMetadata, EngineError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| EngineError::Metadata(e.to_string()))?;

    let info = &torrent.info;
    let name = info.name.as_ref().map(|b| bytes_to_string(b.as_ref()));

    let files = match info.files {
        Some(ref files) => {
            let root = name.clone().unwrap_or_else(|| "unknown".to_string());
            files
                .iter()
                .map(|file| {
                    let mut parts = vec![root.clone()];
                    parts.extend(file.path.iter().map(|p| bytes_to_string(p.as_ref())));
                    parts.join("/")
                })
                .collect()
        }
        None => name.iter().cloned().collect(),
    };

    Ok(TorrentMetadata { name, files })
}

/// Invalid UTF-8 sequences become U+FFFD.
fn bytes_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_invalid_torrent() {
        let result = parse_torrent_metadata(b"not a valid torrent");
        assert!(matches!(result, Err(EngineError::Metadata(_))));
    }

    #[test]
    fn test_parse_empty_data() {
        assert!(parse_torrent_metadata(b"").is_err());
    }

    #[test]
    fn test_parse_single_file_torrent() {
        let bytes = b"d4:infod6:lengthi12e4:name9:notes.txt12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
        let meta = parse_torrent_metadata(bytes).unwrap();
        assert_eq!(meta.name.as_deref(), Some("notes.txt"));
        assert_eq!(meta.files, vec!["notes.txt"]);
    }

    #[test]
    fn test_parse_multi_file_torrent() {
        let bytes = b"d4:infod5:filesld6:lengthi1e4:pathl1:a5:b.txteed6:lengthi2e4:pathl5:c.txteee4:name4:root12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
        let meta = parse_torrent_metadata(bytes).unwrap();
        assert_eq!(meta.name.as_deref(), Some("root"));
        assert_eq!(meta.files, vec!["root/a/b.txt", "root/c.txt"]);
    }

    #[test]
    fn test_bytes_to_string_invalid_utf8() {
        let invalid = vec![0xff, 0xfe, 0x68, 0x65, 0x6c, 0x6c, 0x6f];
        assert_eq!(bytes_to_string(&invalid), "\u{FFFD}\u{FFFD}hello");
        assert_eq!(bytes_to_string("Ünïcode".as_bytes()), "Ünïcode");
    }

    #[test]
    fn test_identity_hashes_info_dictionary() {
        let bytes = b"d4:infod6:lengthi12e4:name9:notes.txt12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
        let identity = parse_torrent_identity(bytes).unwrap();
        assert_eq!(
            identity.info_hash.to_hex(),
            "20ee2926a47746b3c23cc0aa7c418d1ec79310a5"
        );
        assert_eq!(identity.name.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_identity_without_name() {
        let bytes = b"d4:infod6:lengthi12e12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
        let identity = parse_torrent_identity(bytes).unwrap();
        assert_eq!(
            identity.info_hash.to_hex(),
            "1ca093bd837beeb7a17c647108720151a3f03908"
        );
        assert!(identity.name.is_none());
    }

    #[test]
    fn test_identity_rejects_garbage() {
        assert!(matches!(
            parse_torrent_identity(b"d4:spam"),
            Err(EngineError::Metadata(_))
        ));
    }
}
