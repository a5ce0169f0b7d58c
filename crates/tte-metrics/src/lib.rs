//! Error metrics for probabilistic time-to-event forecasts.
//!
//! A forecast predicts, for every evaluated case, when an event such as a bus
//! departure will happen. It comes in one of two representations:
//!
//! - **Parametric**: a Gaussian location and scale per case
//! - **Non-parametric**: a table of predicted values per case, one column per
//!   quantile level with two decimals
//!
//! Both are read through [`prediction::QuantileResolver`], so every metric is
//! written once against that capability:
//!
//! - **Critical error**: one-sided mean errors at operator-chosen security levels
//! - **Interval coverage**: distance of observations to central prediction
//!   intervals, and their width
//! - **Integral error**: L1 distance between the predicted and observed CDFs
//!
//! # Modules
//!
//! - [`prediction`]: Forecast representations and quantile resolution
//! - [`observation`]: Realized event times
//! - [`table`]: Per-level result tables
//! - [`critical`]: Critical and non-critical error
//! - [`interval`]: Prediction-interval coverage
//! - [`integral`]: Integral error, its configuration and diagnostics
//! - [`curves`]: The CDF comparison shared by the integral error and its plots
//! - [`error`]: The error type shared by all of the above
//!
//! # Examples
//!
//! ## Evaluating a Gaussian forecast
//!
//! ```
//! use tte_metrics::{
//!     critical::critical_errors, interval::interval_coverage,
//!     observation::Observations, prediction::ParametricPrediction,
//! };
//!
//! let observations = Observations::from_groups([vec![4.0, 7.5], vec![9.0, 12.0]]).unwrap();
//! let prediction = ParametricPrediction::new(vec![5.0, 8.0, 8.0, 11.0], vec![1.0; 4]).unwrap();
//!
//! let critical = critical_errors(&prediction, &observations, &[0.1, 0.5, 0.9]).unwrap();
//! assert_eq!(critical.len(), 3);
//! assert!(critical.get(0.9).unwrap().critical < critical.get(0.1).unwrap().critical);
//!
//! let coverage = interval_coverage(&prediction, &observations, &[50.0, 90.0]).unwrap();
//! assert!(coverage.get(90.0).unwrap().mean_width > coverage.get(50.0).unwrap().mean_width);
//! ```
//!
//! ## Evaluating a quantile table
//!
//! ```
//! use tte_metrics::{
//!     integral::{IntegralErrorConfig, integral_error},
//!     observation::Observations,
//!     prediction::{NonParametricPrediction, Prediction},
//! };
//!
//! let observations = Observations::new(vec![5.0, 10.0, 15.0]).unwrap();
//! let prediction: Prediction = NonParametricPrediction::from_keyed([
//!     ("0.10", vec![4.0, 8.0, 12.0]),
//!     ("0.50", vec![5.0, 10.0, 15.0]),
//!     ("0.90", vec![6.0, 12.0, 18.0]),
//! ])
//! .unwrap()
//! .into();
//!
//! let report = integral_error(&prediction, &observations, &IntegralErrorConfig::default()).unwrap();
//! assert!(report.is_converged());
//! assert!(report.diagnostics.is_empty());
//! ```

pub mod critical;
pub mod curves;
pub mod error;
pub mod integral;
pub mod interval;
pub mod observation;
pub mod prediction;
pub mod table;
