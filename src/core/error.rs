// エラー型定義
//
// アプリケーション全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、設定・ルール検証・データベース・I/O・移行全体の
// エラーをそれぞれ定義します。

use thiserror::Error;

/// ルール定義の解析エラー
///
/// `MIGRATION_RULE_*` の値が不正な場合に発生します。致命的ではなく、
/// 該当エントリは警告付きで読み飛ばされます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParseError {
    /// Wrong number of pipe-delimited fields
    #[error("Malformed rule '{value}': expected {expected} '|'-separated fields, found {found}")]
    FieldCount {
        /// 元の値
        value: String,
        /// 期待するフィールド数
        expected: usize,
        /// 実際のフィールド数
        found: usize,
    },
}

impl RuleParseError {
    /// 元の設定値を取得
    pub fn value(&self) -> &str {
        match self {
            RuleParseError::FieldCount { value, .. } => value,
        }
    }
}

/// ルール検証エラー
///
/// ルールが参照するデータベース・テーブル・カラムがソースに存在しない場合に発生します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleValidationError {
    /// Database does not exist on the source
    #[error("Database '{database}' does not exist on the source")]
    UnknownDatabase {
        /// データベース名
        database: String,
    },

    /// Table does not exist in the database
    #[error("Table '{table}' does not exist in {database}")]
    UnknownTable {
        /// データベース名
        database: String,
        /// テーブル名
        table: String,
    },

    /// Column does not exist in the table
    #[error("Column '{column}' does not exist in {database}.{table}")]
    UnknownColumn {
        /// データベース名
        database: String,
        /// テーブル名
        table: String,
        /// カラム名
        column: String,
    },

    /// Metadata query failed
    #[error("Failed to inspect source metadata: {message}")]
    Inspection {
        /// エラーメッセージ
        message: String,
    },
}

impl RuleValidationError {
    /// 存在しない識別子に起因するエラーかどうか
    pub fn is_missing_identifier(&self) -> bool {
        !matches!(self, RuleValidationError::Inspection { .. })
    }
}

/// データベースエラー
///
/// データベース操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Transaction error
    #[error("Transaction error: {message}")]
    Transaction {
        /// エラーメッセージ
        message: String,
    },

    /// Value decoding error
    #[error("Failed to decode column '{column}': {message}")]
    Decode {
        /// カラム名
        column: String,
        /// エラーメッセージ
        message: String,
    },
}

impl DatabaseError {
    /// SQL付きのクエリエラーを作成
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        DatabaseError::Query {
            message: message.into(),
            sql: Some(sql.into()),
        }
    }

    /// 接続エラーかどうか
    pub fn is_connection(&self) -> bool {
        matches!(self, DatabaseError::Connection { .. })
    }

    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, DatabaseError::Query { .. })
    }

    /// トランザクションエラーかどうか
    pub fn is_transaction(&self) -> bool {
        matches!(self, DatabaseError::Transaction { .. })
    }

    /// 失敗したSQLを取得
    pub fn sql(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

/// I/Oエラー
///
/// ファイル操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum IoError {
    /// File read error
    #[error("Failed to read file: {path} (cause: {cause})")]
    FileRead {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// File write error
    #[error("Failed to write file: {path} (cause: {cause})")]
    FileWrite {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Directory creation error
    #[error("Failed to create directory: {path} (cause: {cause})")]
    DirectoryCreate {
        /// ディレクトリパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Directory listing error
    #[error("Failed to read directory: {path} (cause: {cause})")]
    DirectoryRead {
        /// ディレクトリパス
        path: String,
        /// エラー原因
        cause: String,
    },
}

impl IoError {
    /// ファイル書き込みエラーかどうか
    pub fn is_file_write(&self) -> bool {
        matches!(self, IoError::FileWrite { .. })
    }

    /// ディレクトリ作成エラーかどうか
    pub fn is_directory_create(&self) -> bool {
        matches!(self, IoError::DirectoryCreate { .. })
    }
}

/// 無効と判定されたルール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRule {
    /// ルール識別子（`database.table.column`）
    pub target: String,
    /// 無効の理由
    pub reason: RuleValidationError,
}

impl std::fmt::Display for InvalidRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

/// 移行全体のエラー
///
/// 制約追加・インデックス調整の失敗は記録のみで継続するため、ここには含まれません。
#[derive(Debug, Error)]
pub enum MigrationError {
    /// One or more rules failed the validation gate
    #[error("{} invalid migration rule(s), aborting before any change", .0.len())]
    InvalidRules(Vec<InvalidRule>),

    /// Failed to (re)create a database or table on the target
    #[error("Schema error in {database}{}: {source}", format_table_opt(.table))]
    Schema {
        /// データベース名
        database: String,
        /// テーブル名（データベース単位の操作ではNone）
        table: Option<String>,
        /// 原因
        #[source]
        source: DatabaseError,
    },

    /// Failed to read or insert a row
    #[error("Data error in {database}.{table} at row {row}: {source}")]
    Data {
        /// データベース名
        database: String,
        /// テーブル名
        table: String,
        /// 失敗した行の位置（1始まり）
        row: u64,
        /// 原因
        #[source]
        source: DatabaseError,
    },

    /// Any other database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Report or file I/O failure
    #[error(transparent)]
    Io(#[from] IoError),
}

impl MigrationError {
    /// 検証ゲートで中断したかどうか
    pub fn is_invalid_rules(&self) -> bool {
        matches!(self, MigrationError::InvalidRules(_))
    }

    /// スキーマエラーかどうか
    pub fn is_schema(&self) -> bool {
        matches!(self, MigrationError::Schema { .. })
    }

    /// データエラーかどうか
    pub fn is_data(&self) -> bool {
        matches!(self, MigrationError::Data { .. })
    }
}

/// ファイル同期エラー
#[derive(Debug, Error)]
pub enum FileSyncError {
    /// Malformed FILE_MIGRATION_RULE_* entry
    #[error("Malformed file mapping '{value}': expected REMOTE|LOCAL or HOST|REMOTE|LOCAL")]
    MalformedMapping {
        /// 元の値
        value: String,
    },

    /// Mapping names a host without FILE_HOST_<NAME>_* settings
    #[error("Unknown file host '{host}'")]
    UnknownHost {
        /// ホスト名
        host: String,
    },

    /// SSH connection or authentication failure
    #[error("Failed to connect to file host '{host}': {cause}")]
    HostConnection {
        /// ホスト名
        host: String,
        /// エラー原因
        cause: String,
    },

    /// Remote directory is not readable
    #[error("Remote directory is not reachable: {path} (cause: {cause})")]
    RemoteUnreachable {
        /// リモートパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Local directory cannot be created
    #[error("Local directory cannot be created: {path} (cause: {cause})")]
    LocalNotCreatable {
        /// ローカルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Copy failure
    #[error(transparent)]
    Io(#[from] IoError),
}

impl FileSyncError {
    /// 事前検証で検出されるエラーかどうか
    pub fn is_validation(&self) -> bool {
        !matches!(self, FileSyncError::Io(_))
    }
}

fn format_table_opt(table: &Option<String>) -> String {
    table.as_ref().map_or(String::new(), |t| format!(".{}", t))
}
