//! Indicator computation and feature alignment for the featline system.
//!
//! This crate handles:
//! - Rolling-window primitives (trailing mean, sample standard deviation)
//! - True range / ATR, Bollinger bands, simple moving averages, RSI and EMA
//! - Alignment of daily, funding-rate and open-interest data onto the hourly timeline

pub mod alignment;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod rolling;
pub mod rsi;

pub use alignment::{interpolate_funding, AlignmentEngine};
pub use atr::AverageTrueRange;
pub use bollinger::{BollingerBands, Bands};
pub use ema::Ema;
pub use engine::IndicatorEngine;
pub use rolling::RollingWindow;
pub use rsi::{Rsi, RsiValue};
