/// Train a hough forest, store it and let it vote for the reference point of an object

extern crate houghvote;
extern crate clap;
#[macro_use]
extern crate log;
extern crate env_logger;
extern crate rand;
extern crate serde_json;
#[macro_use]
extern crate error_chain;

use houghvote::hough::{seeded_rng, ExampleSet, HoughForest, Options, TrainingData};
use houghvote::hough::vote::VoteCollector;
use houghvote::meancov_estimation::{estimate_mean_cov, MatrixFuncSimple};
use clap::{Arg, App};
use rand::Rng;
use std::fs::File;
use std::io::BufReader;
use std::str::FromStr;
use std::process::exit;

error_chain!{
    links {
        Forest(houghvote::Error, houghvote::ErrorKind);
    }
    foreign_links {
        IO(std::io::Error);
        Serde(serde_json::Error);
    }
}

pub fn main() {
    if let Err(e) = main_() {
        eprintln!("Error: {}", e);
        for cause in e.iter().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        exit(-1);
    }
}

macro_rules! try_or_exit {
    ($x: expr) => (
        match $x{
            Ok(x) => x,
            Err(r) => {warn!("Error: {}", r); exit(-1)}
        }
        )
}

macro_rules! TREE_COUNT_DEFAULT { () => (10usize) }
macro_rules! VOTE_COUNT_DEFAULT { () => (100usize) }
macro_rules! SEED_DEFAULT { () => (42u64) }
macro_rules! SYNTHETIC_DEFAULT { () => (200usize) }

/// Objects around (1, 1, 1, 1) voting near (5, 5), background spread over [-5, 5]^4
fn synthetic_set(seed: u64, count: usize) -> Result<ExampleSet> {
    let mut rng = seeded_rng(seed);
    let mut set = ExampleSet::new(2, 4, vec![0, 2])?;
    for _ in 0..count {
        let features = (0..4).map(|_| 1.0 + rng.gen_range(-0.2, 0.2)).collect();
        let vote = vec![5.0 + rng.gen_range(-0.3, 0.3), 5.0 + rng.gen_range(-0.3, 0.3)];
        set.add_example(features, 1, vote)?;
        let features = (0..4).map(|_| rng.gen_range(-5.0, 5.0)).collect();
        set.add_example(features, 0, vec![])?;
    }
    Ok(set)
}

pub fn main_() -> Result<()> {
    env_logger::init();
    let args = App::new("Hough forest trainer")
        .arg(Arg::with_name("data")
            .short("d")
            .long("data")
            .takes_value(true)
            .help("JSON file with training examples - a synthetic set is generated if missing"))
        .arg(Arg::with_name("out_filename")
            .short("o")
            .long("out")
            .takes_value(true)
            .required(true)
            .help("Filename for the trained forest, stored as JSON if it ends in .json"))
        .arg(Arg::with_name("options")
            .long("options")
            .takes_value(true)
            .help("JSON file with forest options - every option is auto-selected if missing"))
        .arg(Arg::with_name("trees")
            .long("trees")
            .takes_value(true)
            .help(concat!("Number of trees for the forest - Default ", TREE_COUNT_DEFAULT!())))
        .arg(Arg::with_name("votes")
            .long("votes")
            .takes_value(true)
            .help(concat!("Number of votes cast from the object centroid - Default ", VOTE_COUNT_DEFAULT!())))
        .arg(Arg::with_name("seed")
            .long("seed")
            .takes_value(true)
            .help(concat!("Seed for training and voting - Default ", SEED_DEFAULT!())))
        .arg(Arg::with_name("synthetic")
            .long("synthetic")
            .takes_value(true)
            .help(concat!("Number of objects in the synthetic set - Default ", SYNTHETIC_DEFAULT!())))
        .arg(Arg::with_name("parallel")
            .long("parallel")
            .help("Grow the trees in parallel"))
        .get_matches();

    let filename = args.value_of("out_filename").ok_or("No valid output filename")?;
    let num_trees = args.value_of("trees").map(|x| try_or_exit!(usize::from_str(x))).unwrap_or(TREE_COUNT_DEFAULT!());
    let num_votes = args.value_of("votes").map(|x| try_or_exit!(usize::from_str(x))).unwrap_or(VOTE_COUNT_DEFAULT!());
    let seed = args.value_of("seed").map(|x| try_or_exit!(u64::from_str(x))).unwrap_or(SEED_DEFAULT!());
    let options = match args.value_of("options") {
        Some(path) => Options::load(path)?,
        None => Options::new(),
    };

    info!("Reading training data");
    let set: ExampleSet = match args.value_of("data") {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => {
            let count = args.value_of("synthetic")
                .map(|x| try_or_exit!(usize::from_str(x)))
                .unwrap_or(SYNTHETIC_DEFAULT!());
            synthetic_set(seed, count)?
        }
    };
    if set.is_empty() {
        bail!("Training set is empty");
    }
    let vote_dims: Vec<usize> = (0..set.num_classes()).map(|c| set.num_vote_parameters(c)).collect();

    info!("Starting Learning");
    let mut forest = HoughForest::new(set.num_classes(), set.num_features(), &vote_dims, options)?;
    let mut rng = seeded_rng(seed);
    if args.is_present("parallel") {
        forest.train_parallel(num_trees, &set, &mut rng)?;
    } else {
        forest.train(num_trees, &set, &mut rng)?;
    }
    info!("Learned successfully");
    forest.save(filename)?;

    let forest = HoughForest::from_file(filename)?;
    forest.dump_to_log();

    for class in 1..forest.num_classes() {
        let centroid = match set.class_centroid(class) {
            Some(c) => c,
            None => {
                warn!("No examples of class {}, skipping", class);
                continue;
            }
        };
        let mut votes = VoteCollector::new();
        let cast = forest.vote_self(class, &centroid, num_votes, &mut rng, &mut votes);
        println!("Class {}: {} of {} votes cast", class, cast, num_votes);
        if let Some(mean) = votes.weighted_mean() {
            println!("  weighted mean {:?}", mean);
        }
        if let Some((mean, cov)) = estimate_mean_cov(&votes.params) {
            println!("  mean {:?}", mean);
            println!("  covariance {:?} (trace {})", cov, cov.trace());
        }
    }
    Ok(())
}
