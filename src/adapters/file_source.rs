// リモートファイルソース
//
// ファイル同期が参照するリモートのディレクトリツリーを抽象化します。
// SFTPで接続する実装と、ローカルにマウントされたツリー（sshfs / NFS など）を読む実装があります。

use crate::core::config::{FileHostConfig, SshAuth, SshSettings};
use crate::core::error::{FileSyncError, IoError};
use ssh2::{Session, Sftp};
use std::net::TcpStream;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// ディレクトリエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// リモート上のパス
    pub path: PathBuf,
    /// ファイル名
    pub name: String,
    /// ディレクトリかどうか
    pub is_dir: bool,
}

/// ファイルのメタデータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub is_dir: bool,
    pub len: u64,
    pub modified: SystemTime,
    pub accessed: SystemTime,
}

/// リモートファイルツリーのインターフェース
pub trait RemoteFileSource {
    /// ディレクトリの内容を名前順で取得
    fn read_dir(&self, remote: &Path) -> Result<Vec<RemoteEntry>, IoError>;

    /// メタデータを取得
    fn metadata(&self, remote: &Path) -> Result<RemoteMetadata, IoError>;

    /// ファイルをローカルにコピーし、コピーしたバイト数を返す
    fn copy_to(&self, remote: &Path, local: &Path) -> Result<u64, IoError>;
}

/// ホスト設定に応じたファイルソースを開く
///
/// SSH設定があればSFTPで接続し、なければマウント済みディレクトリとして扱います。
pub fn open_file_source(host: &FileHostConfig) -> Result<Box<dyn RemoteFileSource>, FileSyncError> {
    match &host.ssh {
        Some(ssh) => Ok(Box::new(SftpFileSource::connect(&host.name, &host.root, ssh)?)),
        None => Ok(Box::new(MountedFileSource::new(host.root.clone()))),
    }
}

/// リモートパスを基準ディレクトリ配下のパスに変換
///
/// 絶対パスは基準ディレクトリからの相対として扱い、`..` で基準より上には出ません。
pub fn resolve_under(root: &Path, remote: &Path) -> PathBuf {
    let mut relative = PathBuf::new();
    for component in remote.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::ParentDir => {
                relative.pop();
            }
            _ => {}
        }
    }
    root.join(relative)
}

/// マウント済みディレクトリを読むファイルソース
#[derive(Debug, Clone)]
pub struct MountedFileSource {
    root: PathBuf,
}

impl MountedFileSource {
    /// マウントポイントを指定して作成
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// リモートパスをマウント上のパスに変換
    pub fn resolve(&self, remote: &Path) -> PathBuf {
        resolve_under(&self.root, remote)
    }
}

impl RemoteFileSource for MountedFileSource {
    fn read_dir(&self, remote: &Path) -> Result<Vec<RemoteEntry>, IoError> {
        let resolved = self.resolve(remote);
        let read_error = |e: std::io::Error| IoError::DirectoryRead {
            path: remote.display().to_string(),
            cause: e.to_string(),
        };

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&resolved).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            // シンボリックリンクはリンク先で判定（リンク切れはファイル扱い）
            let is_dir = match std::fs::metadata(entry.path()) {
                Ok(metadata) => metadata.is_dir(),
                Err(_) => entry.file_type().map_err(read_error)?.is_dir(),
            };
            let name = entry.file_name().to_string_lossy().into_owned();

            entries.push(RemoteEntry {
                path: remote.join(&name),
                name,
                is_dir,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn metadata(&self, remote: &Path) -> Result<RemoteMetadata, IoError> {
        let read_error = |e: std::io::Error| IoError::FileRead {
            path: remote.display().to_string(),
            cause: e.to_string(),
        };

        let metadata = std::fs::metadata(self.resolve(remote)).map_err(read_error)?;
        let modified = metadata.modified().map_err(read_error)?;
        // atime を持たないファイルシステムでは mtime で代用
        let accessed = metadata.accessed().unwrap_or(modified);

        Ok(RemoteMetadata {
            is_dir: metadata.is_dir(),
            len: metadata.len(),
            modified,
            accessed,
        })
    }

    fn copy_to(&self, remote: &Path, local: &Path) -> Result<u64, IoError> {
        std::fs::copy(self.resolve(remote), local).map_err(|e| IoError::FileWrite {
            path: local.display().to_string(),
            cause: e.to_string(),
        })
    }
}

/// SFTPで接続するファイルソース
pub struct SftpFileSource {
    sftp: Sftp,
    // 接続を保持する
    _session: Session,
    root: PathBuf,
}

impl SftpFileSource {
    /// SSH接続と認証を行い、SFTPチャネルを開く
    pub fn connect(name: &str, root: &Path, ssh: &SshSettings) -> Result<Self, FileSyncError> {
        let failed = |cause: String| FileSyncError::HostConnection {
            host: name.to_string(),
            cause,
        };

        let user = ssh
            .user
            .as_deref()
            .ok_or_else(|| failed("SSH user is not set".to_string()))?;
        let auth = ssh
            .auth
            .as_ref()
            .ok_or_else(|| failed("neither a password nor a private key is configured".to_string()))?;
        if let SshAuth::PrivateKey { path, .. } = auth {
            if !path.is_file() {
                return Err(failed(format!("private key not found: {}", path.display())));
            }
        }

        debug!(host = %name, server = %ssh.display_target(), "Connecting to file host");
        let tcp = TcpStream::connect((ssh.host.as_str(), ssh.port))
            .map_err(|e| failed(e.to_string()))?;
        let mut session = Session::new().map_err(|e| failed(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| failed(e.to_string()))?;

        let method = match auth {
            SshAuth::Password(password) => {
                session.userauth_password(user, password).map(|_| "password")
            }
            SshAuth::PrivateKey { path, passphrase } => session
                .userauth_pubkey_file(user, None, path, passphrase.as_deref())
                .map(|_| "private key"),
        }
        .map_err(|e| failed(e.to_string()))?;

        let sftp = session.sftp().map_err(|e| failed(e.to_string()))?;
        info!(host = %name, server = %ssh.display_target(), method, "Connected to file host");

        Ok(Self {
            sftp,
            _session: session,
            root: root.to_path_buf(),
        })
    }

    fn resolve(&self, remote: &Path) -> PathBuf {
        resolve_under(&self.root, remote)
    }
}

/// SFTPのタイムスタンプ（UNIX秒）をSystemTimeに変換
fn from_unix_secs(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

impl RemoteFileSource for SftpFileSource {
    fn read_dir(&self, remote: &Path) -> Result<Vec<RemoteEntry>, IoError> {
        let listing = self
            .sftp
            .readdir(&self.resolve(remote))
            .map_err(|e| IoError::DirectoryRead {
                path: remote.display().to_string(),
                cause: e.to_string(),
            })?;

        let mut entries = Vec::with_capacity(listing.len());
        for (path, stat) in listing {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let is_dir = if stat.file_type().is_symlink() {
                self.sftp.stat(&path).map(|s| s.is_dir()).unwrap_or(false)
            } else {
                stat.is_dir()
            };

            entries.push(RemoteEntry {
                path: remote.join(&name),
                name,
                is_dir,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn metadata(&self, remote: &Path) -> Result<RemoteMetadata, IoError> {
        let stat = self
            .sftp
            .stat(&self.resolve(remote))
            .map_err(|e| IoError::FileRead {
                path: remote.display().to_string(),
                cause: e.to_string(),
            })?;

        let modified = from_unix_secs(stat.mtime.unwrap_or(0));
        Ok(RemoteMetadata {
            is_dir: stat.is_dir(),
            len: stat.size.unwrap_or(0),
            modified,
            accessed: stat.atime.map(from_unix_secs).unwrap_or(modified),
        })
    }

    fn copy_to(&self, remote: &Path, local: &Path) -> Result<u64, IoError> {
        let mut reader = self
            .sftp
            .open(&self.resolve(remote))
            .map_err(|e| IoError::FileRead {
                path: remote.display().to_string(),
                cause: e.to_string(),
            })?;
        let write_error = |e: std::io::Error| IoError::FileWrite {
            path: local.display().to_string(),
            cause: e.to_string(),
        };

        let mut writer = std::fs::File::create(local).map_err(write_error)?;
        std::io::copy(&mut reader, &mut writer).map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_absolute_path_under_root() {
        let source = MountedFileSource::new("/mnt/web01");

        assert_eq!(
            source.resolve(Path::new("/var/www/uploads")),
            PathBuf::from("/mnt/web01/var/www/uploads")
        );
        assert_eq!(
            source.resolve(Path::new("uploads")),
            PathBuf::from("/mnt/web01/uploads")
        );
    }

    #[test]
    fn test_resolve_parent_dir_stays_under_root() {
        let source = MountedFileSource::new("/mnt/web01");

        assert_eq!(
            source.resolve(Path::new("/../../etc")),
            PathBuf::from("/mnt/web01/etc")
        );
        assert_eq!(
            source.resolve(Path::new("/var/www/../logs/./app")),
            PathBuf::from("/mnt/web01/var/logs/app")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_read_dir_follows_directory_symlink() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("broken")).unwrap();

        let source = MountedFileSource::new(temp.path());
        let entries = source.read_dir(Path::new("/")).unwrap();

        let dirs: Vec<(&str, bool)> = entries
            .iter()
            .map(|e| (e.name.as_str(), e.is_dir))
            .collect();
        assert_eq!(
            dirs,
            vec![("broken", false), ("link", true), ("real", true)]
        );
    }

    #[test]
    fn test_open_file_source_mounted() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();

        let source = open_file_source(&FileHostConfig::mounted("web", temp.path())).unwrap();

        assert_eq!(source.read_dir(Path::new("/")).unwrap().len(), 1);
    }

    #[test]
    fn test_sftp_without_credentials_is_connection_error() {
        let mut ssh = SshSettings::new("127.0.0.1");
        ssh.user = Some("deploy".to_string());

        let result = SftpFileSource::connect("web", Path::new("/"), &ssh);

        match result {
            Err(FileSyncError::HostConnection { host, cause }) => {
                assert_eq!(host, "web");
                assert!(cause.contains("neither a password nor a private key"));
            }
            Err(other) => panic!("Expected HostConnection, got {:?}", other),
            Ok(_) => panic!("Expected HostConnection, got a connection"),
        }
    }

    #[test]
    fn test_sftp_missing_private_key_is_connection_error() {
        let temp = TempDir::new().unwrap();
        let mut ssh = SshSettings::new("127.0.0.1");
        ssh.user = Some("deploy".to_string());
        ssh.auth = Some(SshAuth::PrivateKey {
            path: temp.path().join("id_ed25519"),
            passphrase: None,
        });

        let result = SftpFileSource::connect("web", Path::new("/"), &ssh);

        assert!(matches!(result, Err(FileSyncError::HostConnection { .. })));
    }

    #[test]
    fn test_read_dir_sorted() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("b_dir")).unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        std::fs::write(temp.path().join("c.txt"), "c").unwrap();

        let source = MountedFileSource::new(temp.path());
        let entries = source.read_dir(Path::new("/")).unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b_dir", "c.txt"]);
        assert!(entries[1].is_dir);
        assert_eq!(entries[0].path, PathBuf::from("/a.txt"));
    }

    #[test]
    fn test_read_dir_missing_is_error() {
        let temp = TempDir::new().unwrap();
        let source = MountedFileSource::new(temp.path());

        let result = source.read_dir(Path::new("/missing"));

        assert!(matches!(result, Err(IoError::DirectoryRead { .. })));
    }

    #[test]
    fn test_copy_to() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("report.csv"), "id\n1\n").unwrap();
        let destination = temp.path().join("copy.csv");

        let source = MountedFileSource::new(temp.path());
        let copied = source
            .copy_to(Path::new("/report.csv"), &destination)
            .unwrap();

        assert_eq!(copied, 5);
        assert_eq!(std::fs::read_to_string(destination).unwrap(), "id\n1\n");
    }
}
