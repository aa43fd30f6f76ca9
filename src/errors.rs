//! Errors reported by the forest.
//!
//! Programmer errors (querying the background class, feature vectors of the
//! wrong length, voting on an untrained forest) are not represented here:
//! they panic.

error_chain!{
    foreign_links {
        Io(::std::io::Error);
        Json(::serde_json::Error);
    }

    errors {
        // Class, feature or vote dimension counts or option values are unusable.
        InvalidConfiguration(msg: String) {
            description("invalid forest configuration")
            display("Invalid forest configuration: {}", msg)
        }
        EmptyTrainingSet {
            description("empty training set")
            display("Training set contains no examples")
        }
        // The training data does not describe the problem the forest was built for.
        TrainingDataMismatch(msg: String) {
            description("training data does not match the forest")
            display("Training data does not match the forest: {}", msg)
        }
        // A persisted forest could not be decoded or is inconsistent.
        CorruptForest(msg: String) {
            description("corrupt forest data")
            display("Corrupt forest data: {}", msg)
        }
    }
}
