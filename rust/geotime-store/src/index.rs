use std::{fmt, sync::Arc};

use geotime_common::{Result, error::Error, verify_arg};
use geotime_index_core::IndexStrategy;

use crate::model::IndexModel;

/// A named index: the strategy that produces insertion IDs and the model that
/// says which entity value supplies each of its dimensions.
///
/// An `Index` is immutable and meant to be shared (`Arc<Index>`) by every
/// encoder of a deployment.
#[derive(Clone)]
pub struct Index {
    name: String,
    strategy: Arc<dyn IndexStrategy>,
    model: Arc<IndexModel>,
}

impl Index {
    /// Binds `strategy` and `model` under `name`.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty or the model's dimension definitions differ
    /// from the strategy's, in content or in order.
    pub fn new(
        name: impl Into<String>,
        strategy: Arc<dyn IndexStrategy>,
        model: Arc<IndexModel>,
    ) -> Result<Index> {
        let name = name.into();
        verify_arg!(name, !name.is_empty());
        if strategy.dimensions() != model.dimension_definitions().as_slice() {
            return Err(Error::invalid_arg(
                "model",
                format!(
                    "dimensions of model do not match strategy '{}'",
                    strategy.id()
                ),
            ));
        }
        Ok(Index {
            name,
            strategy,
            model,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &Arc<dyn IndexStrategy> {
        &self.strategy
    }

    pub fn model(&self) -> &Arc<IndexModel> {
        &self.model
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("strategy", &self.strategy.id())
            .field("model", &self.model)
            .finish()
    }
}
