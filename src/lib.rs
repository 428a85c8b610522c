// dbferryライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメインロジック（ルール解析、行変換、テーブル定義分解、進捗、レポート）
// - adapters: MySQLサーバーとリモートファイルツリーへのアクセスを抽象化
// - services: 設定読み込み、ルール検証、移行パイプライン、ファイル同期

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
