//! Reading and writing trained forests.
//!
//! Two formats are supported. The binary format is a little endian stream:
//!
//! ```text
//! magic "HOUGHFST", version u32
//! class count u64, feature count u64, vote dimension u64 per class
//! options: max_depth, max_leaf_elements, max_candidate_features,
//!          num_feature_expansions, max_candidate_thresholds as i64,
//!          max_dominant_fraction f64, probabilistic sampling u8,
//!          empty leaf policy u8, verbose i32
//! tree count u64, per tree: root u64, node count u64, per node
//!     tag u8 (0 = split: feature u64, threshold f64, left u64, right u64;
//!             1 = leaf: example count u64, example indices u64)
//! cache: example count u64, padded vote dimension u64,
//!        features f64 (row-major), classes u64, self-votes f64 (row-major)
//! ```
//!
//! Only the resolved options are stored, so a forest read back from a binary
//! stream reports them as its options. The JSON format is the serde
//! representation of `HoughForest` and keeps both.

use super::cache::ExampleCache;
use super::houghforest::HoughForest;
use super::houghtree::HoughTree;
use super::node::{Node, NodeIndex};
use super::options::{EmptyLeafPolicy, Options};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use errors::*;
use serde_json;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &'static [u8; 8] = b"HOUGHFST";
const VERSION: u32 = 1;

const TAG_SPLIT: u8 = 0;
const TAG_LEAF: u8 = 1;

type End = LittleEndian;

/// On-disk format of a forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Binary,
    Json,
}

impl Codec {
    /// JSON for paths ending in `.json`, binary otherwise.
    pub fn for_path<P: AsRef<Path>>(path: P) -> Codec {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Codec::Json,
            _ => Codec::Binary,
        }
    }
}

impl HoughForest {
    /// Writes the forest to a binary stream.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<End>(VERSION)?;
        writer.write_u64::<End>(self.num_classes() as u64)?;
        writer.write_u64::<End>(self.num_features() as u64)?;
        for c in 0..self.num_classes() {
            writer.write_u64::<End>(self.num_vote_parameters(c) as u64)?;
        }
        write_options(writer, self.get_resolved_options())?;

        writer.write_u64::<End>(self.num_trees() as u64)?;
        for tree in self.trees() {
            write_tree(writer, tree)?;
        }

        let cache = self.cache();
        writer.write_u64::<End>(cache.len() as u64)?;
        writer.write_u64::<End>(cache.max_vote_params() as u64)?;
        for v in cache.raw_features() {
            writer.write_f64::<End>(*v)?;
        }
        for c in cache.classes() {
            writer.write_u64::<End>(*c as u64)?;
        }
        for v in cache.raw_self_votes() {
            writer.write_f64::<End>(*v)?;
        }
        Ok(())
    }

    /// Replaces this forest by one read from a binary stream.
    /// On error the forest is left unchanged.
    pub fn read<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        *self = HoughForest::from_reader(reader)?;
        Ok(())
    }

    /// Reads a forest from a binary stream.
    pub fn from_reader<R: Read + ?Sized>(reader: &mut R) -> Result<HoughForest> {
        let mut magic = [0u8; 8];
        read_exact(reader, &mut magic)?;
        if &magic != MAGIC {
            bail!(ErrorKind::CorruptForest("not a hough forest stream".to_string()));
        }
        let version = reader.read_u32::<End>().map_err(truncated)?;
        if version != VERSION {
            bail!(ErrorKind::CorruptForest(format!("unsupported version {}", version)));
        }

        let num_classes = read_len(reader)?;
        let num_features = read_len(reader)?;
        let mut num_vote_params = vec![];
        for _ in 0..num_classes {
            num_vote_params.push(read_len(reader)?);
        }
        let options = read_options(reader)?;

        let num_trees = read_len(reader)?;
        let mut trees = vec![];
        for _ in 0..num_trees {
            trees.push(read_tree(reader)?);
        }

        let num_examples = read_len(reader)?;
        let max_vote_params = read_len(reader)?;
        let features = read_f64s(reader, num_examples.saturating_mul(num_features))?;
        let mut classes = vec![];
        for _ in 0..num_examples {
            classes.push(read_len(reader)?);
        }
        let self_votes = read_f64s(reader, num_examples.saturating_mul(max_vote_params))?;
        let cache = match ExampleCache::from_parts(num_features, max_vote_params, classes, features, self_votes) {
            Some(cache) => cache,
            None => bail!(ErrorKind::CorruptForest("inconsistent example table".to_string())),
        };

        HoughForest::from_parts(num_classes, num_features, num_vote_params, options, trees, cache)
    }

    /// Writes the forest as JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Replaces this forest by one read from JSON.
    /// On error the forest is left unchanged.
    pub fn read_json<R: Read>(&mut self, reader: R) -> Result<()> {
        *self = HoughForest::from_json(reader)?;
        Ok(())
    }

    /// Reads a forest from JSON.
    pub fn from_json<R: Read>(reader: R) -> Result<HoughForest> {
        let forest: HoughForest = serde_json::from_reader(reader)
            .chain_err(|| ErrorKind::CorruptForest("malformed JSON".to_string()))?;
        forest.check_consistency()?;
        Ok(forest)
    }

    /// Saves the forest, choosing the format from the file extension (see `Codec::for_path`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let codec = Codec::for_path(&path);
        self.save_as(path, codec)
    }

    pub fn save_as<P: AsRef<Path>>(&self, path: P, codec: Codec) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            warn!("Cannot create forest file {}: {}", path.display(), e);
            e
        })?;
        let mut writer = BufWriter::new(file);
        match codec {
            Codec::Binary => self.write(&mut writer)?,
            Codec::Json => self.write_json(&mut writer)?,
        }
        writer.flush()?;
        if self.get_resolved_options().get_verbose() >= 1 {
            info!("Saved forest with {} trees to {}", self.num_trees(), path.display());
        }
        Ok(())
    }

    /// Replaces this forest by the one stored at `path`, choosing the format
    /// from the file extension. On error the forest is left unchanged.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        *self = HoughForest::from_file(path)?;
        Ok(())
    }

    /// Reads the forest stored at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<HoughForest> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            warn!("Cannot open forest file {}: {}", path.display(), e);
            e
        })?;
        let mut reader = BufReader::new(file);
        let forest = match Codec::for_path(path) {
            Codec::Binary => HoughForest::from_reader(&mut reader)?,
            Codec::Json => HoughForest::from_json(reader)?,
        };
        if forest.get_resolved_options().get_verbose() >= 1 {
            info!("Loaded forest with {} trees from {}", forest.num_trees(), path.display());
        }
        Ok(forest)
    }
}

fn write_options<W: Write + ?Sized>(writer: &mut W, options: &Options) -> Result<()> {
    writer.write_i64::<End>(options.get_max_depth())?;
    writer.write_i64::<End>(options.get_max_leaf_elements())?;
    writer.write_i64::<End>(options.get_max_candidate_features())?;
    writer.write_i64::<End>(options.get_num_feature_expansions())?;
    writer.write_i64::<End>(options.get_max_candidate_thresholds())?;
    writer.write_f64::<End>(options.get_max_dominant_fraction())?;
    writer.write_u8(options.get_probabilistic_sampling() as u8)?;
    writer.write_u8(match options.get_empty_leaf_policy() {
            EmptyLeafPolicy::GlobalClassPool => 0,
            EmptyLeafPolicy::Skip => 1,
        })?;
    writer.write_i32::<End>(options.get_verbose())?;
    Ok(())
}

fn read_options<R: Read + ?Sized>(reader: &mut R) -> Result<Options> {
    let mut ints = [0i64; 5];
    for v in ints.iter_mut() {
        *v = reader.read_i64::<End>().map_err(truncated)?;
    }
    let max_dominant_fraction = reader.read_f64::<End>().map_err(truncated)?;
    let probabilistic = match reader.read_u8().map_err(truncated)? {
        0 => false,
        1 => true,
        v => bail!(ErrorKind::CorruptForest(format!("invalid sampling flag {}", v))),
    };
    let policy = match reader.read_u8().map_err(truncated)? {
        0 => EmptyLeafPolicy::GlobalClassPool,
        1 => EmptyLeafPolicy::Skip,
        v => bail!(ErrorKind::CorruptForest(format!("invalid empty leaf policy {}", v))),
    };
    let verbose = reader.read_i32::<End>().map_err(truncated)?;
    Ok(Options::new()
        .max_depth(ints[0])
        .max_leaf_elements(ints[1])
        .max_candidate_features(ints[2])
        .num_feature_expansions(ints[3])
        .max_candidate_thresholds(ints[4])
        .max_dominant_fraction(max_dominant_fraction)
        .probabilistic_sampling(probabilistic)
        .empty_leaf_policy(policy)
        .verbose(verbose))
}

fn write_tree<W: Write + ?Sized>(writer: &mut W, tree: &HoughTree) -> Result<()> {
    writer.write_u64::<End>(tree.root().index() as u64)?;
    writer.write_u64::<End>(tree.num_nodes() as u64)?;
    for node in tree.nodes() {
        match *node {
            Node::Split { feature, threshold, left, right } => {
                writer.write_u8(TAG_SPLIT)?;
                writer.write_u64::<End>(feature as u64)?;
                writer.write_f64::<End>(threshold)?;
                writer.write_u64::<End>(left.index() as u64)?;
                writer.write_u64::<End>(right.index() as u64)?;
            }
            Node::Leaf { ref examples } => {
                writer.write_u8(TAG_LEAF)?;
                writer.write_u64::<End>(examples.len() as u64)?;
                for e in examples {
                    writer.write_u64::<End>(*e as u64)?;
                }
            }
        }
    }
    Ok(())
}

fn read_tree<R: Read + ?Sized>(reader: &mut R) -> Result<HoughTree> {
    let root = NodeIndex::new(read_len(reader)?);
    let num_nodes = read_len(reader)?;
    let mut nodes = vec![];
    for _ in 0..num_nodes {
        let node = match reader.read_u8().map_err(truncated)? {
            TAG_SPLIT => {
                let feature = read_len(reader)?;
                let threshold = reader.read_f64::<End>().map_err(truncated)?;
                let left = NodeIndex::new(read_len(reader)?);
                let right = NodeIndex::new(read_len(reader)?);
                Node::Split {
                    feature: feature,
                    threshold: threshold,
                    left: left,
                    right: right,
                }
            }
            TAG_LEAF => {
                let count = read_len(reader)?;
                let mut examples = vec![];
                for _ in 0..count {
                    examples.push(read_len(reader)?);
                }
                Node::Leaf { examples: examples }
            }
            tag => bail!(ErrorKind::CorruptForest(format!("unknown node tag {}", tag))),
        };
        nodes.push(node);
    }
    Ok(HoughTree::from_parts(nodes, root))
}

fn truncated(e: ::std::io::Error) -> Error {
    Error::with_chain(e, ErrorKind::CorruptForest("truncated stream".to_string()))
}

fn read_exact<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(truncated)
}

fn read_len<R: Read + ?Sized>(reader: &mut R) -> Result<usize> {
    let v = reader.read_u64::<End>().map_err(truncated)?;
    if v > usize::max_value() as u64 {
        bail!(ErrorKind::CorruptForest(format!("count {} does not fit into memory", v)));
    }
    Ok(v as usize)
}

fn read_f64s<R: Read + ?Sized>(reader: &mut R, count: usize) -> Result<Vec<f64>> {
    let mut values = vec![];
    for _ in 0..count {
        values.push(reader.read_f64::<End>().map_err(truncated)?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hough::seeded_rng;
    use hough::training_data::clustered_example_set;
    use hough::vote::VoteCollector;
    use std::env;
    use std::fs;
    use std::io::Cursor;

    fn trained(probabilistic: bool) -> HoughForest {
        let set = clustered_example_set(21, 15, 15);
        let options = Options::new().probabilistic_sampling(probabilistic).verbose(0);
        let mut forest = HoughForest::new(2, 4, &[0, 2], options).unwrap();
        forest.train(5, &set, &mut seeded_rng(21)).unwrap();
        forest
    }

    fn votes_of(forest: &HoughForest) -> VoteCollector {
        let mut votes = VoteCollector::new();
        forest.vote_self(1, &[1.0, 1.0, 1.0, 1.0], 40, &mut seeded_rng(3), &mut votes);
        votes
    }

    #[test]
    fn test_binary_round_trip() {
        let forest = trained(true);
        let mut buf = vec![];
        forest.write(&mut buf).unwrap();
        assert_eq!(&buf[..8], b"HOUGHFST");

        let loaded = HoughForest::from_reader(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(loaded.trees(), forest.trees());
        assert_eq!(loaded.cache(), forest.cache());
        assert_eq!(loaded.get_options(), forest.get_resolved_options());
        assert_eq!(loaded.get_resolved_options(), forest.get_resolved_options());
        assert_eq!(votes_of(&loaded), votes_of(&forest));

        let mut again = vec![];
        loaded.write(&mut again).unwrap();
        assert_eq!(buf, again);
    }

    #[test]
    fn test_json_round_trip() {
        let forest = trained(false);
        let mut buf = vec![];
        forest.write_json(&mut buf).unwrap();
        let mut loaded = HoughForest::new(3, 1, &[0, 1, 1], Options::new()).unwrap();
        loaded.read_json(&buf[..]).unwrap();
        assert_eq!(loaded, forest);
        assert_eq!(votes_of(&loaded), votes_of(&forest));
    }

    #[test]
    fn test_save_and_load_by_extension() {
        let forest = trained(true);
        let dir = env::temp_dir();
        for name in &["houghvote_forest_{}.bin", "houghvote_forest_{}.json"] {
            let path = dir.join(name.replace("{}", &::std::process::id().to_string()));
            forest.save(&path).unwrap();
            let loaded = HoughForest::from_file(&path).unwrap();
            let mut other = HoughForest::new(2, 4, &[0, 2], Options::new()).unwrap();
            other.load(&path).unwrap();
            fs::remove_file(&path).unwrap();
            assert_eq!(votes_of(&loaded), votes_of(&forest));
            assert_eq!(other.trees(), forest.trees());
        }
    }

    #[test]
    fn test_codec_for_path() {
        assert_eq!(Codec::for_path("forest.json"), Codec::Json);
        assert_eq!(Codec::for_path("forest.JSON"), Codec::Json);
        assert_eq!(Codec::for_path("forest.bin"), Codec::Binary);
        assert_eq!(Codec::for_path("forest"), Codec::Binary);
    }

    #[test]
    fn test_missing_file_leaves_forest_unchanged() {
        let mut forest = trained(false);
        let before = forest.clone();
        let path = env::temp_dir().join("houghvote_forest_does_not_exist.bin");
        assert!(forest.load(&path).is_err());
        assert_eq!(forest, before);
    }

    #[test]
    fn test_corrupt_streams_are_rejected() {
        let mut forest = trained(false);
        let before = forest.clone();
        let mut buf = vec![];
        forest.write(&mut buf).unwrap();

        let mut bad_magic = buf.clone();
        bad_magic[0] = b'X';
        assert!(forest.read(&mut Cursor::new(&bad_magic)).is_err());

        let short = &buf[..buf.len() / 2];
        match HoughForest::from_reader(&mut Cursor::new(short)) {
            Err(Error(ErrorKind::CorruptForest(_), _)) => (),
            other => panic!("unexpected result {:?}", other.map(|f| f.num_trees())),
        }

        // the first node tag follows header, options and the root/node counts of tree 0
        let tag_pos = 8 + 4 + 8 * (2 + 2) + 8 * 5 + 8 + 1 + 1 + 4 + 8 + 8 + 8;
        let mut bad_tag = buf.clone();
        bad_tag[tag_pos] = 7;
        assert!(forest.read(&mut Cursor::new(&bad_tag)).is_err());

        assert!(forest.read_json(&b"{\"num_classes\": 2"[..]).is_err());
        assert_eq!(forest, before);
    }

    #[test]
    fn test_out_of_range_indices_are_rejected() {
        let forest = trained(false);
        let mut json = serde_json::to_value(&forest).unwrap();
        json["cache"]["classes"][0] = serde_json::Value::from(9);
        let mut copy = forest.clone();
        match copy.read_json(json.to_string().as_bytes()) {
            Err(Error(ErrorKind::CorruptForest(_), _)) => (),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(copy, forest);
    }

    #[test]
    fn test_short_example_tables_are_rejected() {
        let forest = trained(false);
        for table in &["features", "self_votes"] {
            let mut json = serde_json::to_value(&forest).unwrap();
            json["cache"][*table] = serde_json::Value::from(vec![1.0, 1.0, 1.0, 1.0]);
            match HoughForest::from_json(json.to_string().as_bytes()) {
                Err(Error(ErrorKind::CorruptForest(_), _)) => (),
                other => panic!("{} accepted: {:?}", table, other.map(|f| f.num_examples())),
            }
            let mut copy = forest.clone();
            assert!(copy.read_json(json.to_string().as_bytes()).is_err());
            assert_eq!(copy, forest);
        }
        // the untouched document still votes
        let json = serde_json::to_value(&forest).unwrap();
        let loaded = HoughForest::from_json(json.to_string().as_bytes()).unwrap();
        assert_eq!(votes_of(&loaded).len(), 40);
    }
}
