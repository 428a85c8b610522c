// Core Domain
// ルール解析、行変換、テーブル定義分解、進捗、レポートの純粋なビジネスロジック

pub mod config;
pub mod error;
pub mod progress;
pub mod report;
pub mod rule;
pub mod schema;
pub mod transform;
pub mod value;
