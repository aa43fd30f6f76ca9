extern crate rand;
#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate rayon;
extern crate byteorder;

#[macro_use]
extern crate error_chain;

#[macro_use]
extern crate log;

pub mod errors;
pub mod hough;
pub mod meancov_estimation;

pub use errors::{Error, ErrorKind, Result};
pub use hough::{HoughForest, Options, TrainingData, Vote, VoteCallback};
