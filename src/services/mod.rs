// Services Layer
// 設定読み込み、ルール検証、移行パイプライン、レポート、ファイル同期

pub mod config_loader;
pub mod file_sync;
pub mod migration_pipeline;
pub mod report_generator;
pub mod report_writer;
pub mod rule_validator;
