//! 連番写真の特徴点マッチング計測・可視化ツール

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod matcher;
pub mod plot;
pub mod scanner;
