//! Named model containers.
//!
//! A container ("bag") is a JSON file holding a list of topic-tagged
//! messages. A model is stored under [`MODEL_TOPIC`]; reading expects exactly
//! one record on that topic.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::message::MixtureMessage;
use crate::error::{Error, Result};
use crate::gaussian::Component;
use crate::mixture::GaussianMixture;

/// Topic under which mixture models are stored.
pub const MODEL_TOPIC: &str = "gaussian_mixture_model";

/// One entry of a [`ModelBag`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagRecord {
    /// Topic name.
    pub topic: String,
    /// Stored model.
    pub message: MixtureMessage,
}

/// A persisted collection of topic-tagged model messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelBag {
    records: Vec<BagRecord>,
}

impl ModelBag {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, topic: impl Into<String>, message: MixtureMessage) -> &mut Self {
        self.records.push(BagRecord {
            topic: topic.into(),
            message,
        });
        self
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[BagRecord] {
        &self.records
    }

    /// Messages stored under `topic`.
    pub fn messages<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a MixtureMessage> + 'a {
        self.records
            .iter()
            .filter(move |r| r.topic == topic)
            .map(|r| &r.message)
    }

    /// Load a container file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write the container file, replacing it if it exists.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }
}

impl<const D: usize, G: Component<D>> GaussianMixture<D, G> {
    /// Store the model as the single entry of a new container file.
    pub fn to_bag<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let result = self.to_message().and_then(|msg| {
            let mut bag = ModelBag::new();
            bag.push(MODEL_TOPIC, msg);
            bag.save(path)
        });
        if let Err(e) = &result {
            error!(path = %path.display(), error = %e, "could not write gaussian mixture container");
        }
        result
    }

    /// Load the model from a container holding exactly one model entry.
    pub fn from_bag<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let result = ModelBag::open(path).and_then(|bag| {
            let mut models = bag.messages(MODEL_TOPIC);
            let msg = models
                .next()
                .ok_or_else(|| Error::Container("no model stored".into()))?;
            if models.next().is_some() {
                return Err(Error::Container("more than one model stored".into()));
            }
            self.from_message(msg)
        });
        match &result {
            Ok(()) => debug!(path = %path.display(), states = self.num_states(), "loaded gaussian mixture container"),
            Err(e) => error!(path = %path.display(), error = %e, "could not read gaussian mixture container"),
        }
        result
    }
}
