//! Sample model type and its factory.

use lazycache_core::{Args, FnProducer, Param, ProducerError, Signature};

#[derive(Debug, Clone, PartialEq)]
pub struct CacheModel {
    pub name: String,
}

impl CacheModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// `create_models(count = 10, start = 0, name_prefix = "Model")`.
///
/// Yields `count` models named `{name_prefix}_{index}` for consecutive
/// indices beginning at `start`. `count` comes first so that a single bound
/// argument is the count; `args![2, 5]` is two models starting at index 5.
pub fn create_models() -> FnProducer<impl Fn(&Args) -> Result<Vec<CacheModel>, ProducerError>> {
    FnProducer::new(
        Signature::new("create_models")
            .param(Param::optional("count", 10))
            .param(Param::optional("start", 0))
            .param(Param::optional("name_prefix", "Model")),
        |args: &Args| -> Result<Vec<CacheModel>, ProducerError> {
            let count: u32 = args.get(0)?;
            let start: u32 = args.get(1)?;
            let prefix: String = args.get(2)?;
            let end = start.checked_add(count).ok_or_else(|| ProducerError::InvalidArgument {
                index: 0,
                reason: format!("{start} + {count} overflows"),
            })?;
            Ok((start..end)
                .map(|index| CacheModel::new(format!("{prefix}_{index}")))
                .collect())
        },
    )
}
