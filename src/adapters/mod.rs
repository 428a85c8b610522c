// Adapters
// MySQLサーバーとリモートファイルツリーへのアクセスを抽象化

pub mod connection_string;
pub mod database;
pub mod file_source;
pub mod source;
pub mod sql_quote;
pub mod target;
pub mod value_codec;
