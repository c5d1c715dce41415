//! Producer signatures and argument binding.
//!
//! A producer is any routine that computes the items of one cache entry. It
//! declares a [`Signature`] (required parameters first, then optional ones
//! with defaults) and receives its arguments as an [`Args`] list.
//!
//! The registry never deals with arguments itself. Registration binds the
//! producer and its arguments into a [`BoundProducer`], a zero-argument
//! "produce now" closure, and arity is checked exactly once while binding.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CacheError, CacheResult, ProducerError};

/// One declared producer parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: &'static str,
    default: Option<Value>,
}

impl Param {
    /// Parameter that must always be supplied.
    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    /// Parameter that falls back to `default` when omitted.
    pub fn optional(name: &'static str, default: impl Into<Value>) -> Self {
        Self {
            name,
            default: Some(default.into()),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Declared parameter list of a producer.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    name: &'static str,
    params: Vec<Param>,
}

impl Signature {
    /// Signature with no parameters.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    ///
    /// # Panics
    ///
    /// Panics if a required parameter follows an optional one.
    pub fn param(mut self, param: Param) -> Self {
        assert!(
            param.is_optional() || self.params.iter().all(|p| !p.is_optional()),
            "required parameter `{}` of `{}` follows an optional parameter",
            param.name,
            self.name
        );
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Count of parameters without a default.
    pub fn required(&self) -> usize {
        self.params.iter().filter(|p| !p.is_optional()).count()
    }

    /// Count of all parameters.
    pub fn total(&self) -> usize {
        self.params.len()
    }

    pub fn accepts(&self, supplied: usize) -> bool {
        supplied >= self.required() && supplied <= self.total()
    }

    /// Validate an argument count against this signature.
    pub fn check(&self, supplied: usize) -> CacheResult<()> {
        if self.accepts(supplied) {
            Ok(())
        } else {
            Err(CacheError::ArityMismatch {
                producer: self.name,
                supplied,
                required: self.required(),
                total: self.total(),
            })
        }
    }

    /// Fill omitted trailing optional parameters with their defaults.
    fn complete(&self, mut args: Args) -> Args {
        for param in self.params.iter().skip(args.len()) {
            if let Some(default) = &param.default {
                args.0.push(default.clone());
            }
        }
        args
    }
}

/// Ordered argument list handed to a producer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument, builder style.
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.0.push(value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the argument at `index` into `T`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, ProducerError> {
        let value = self.0.get(index).ok_or_else(|| ProducerError::InvalidArgument {
            index,
            reason: format!("only {} arguments bound", self.0.len()),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| ProducerError::InvalidArgument {
            index,
            reason: e.to_string(),
        })
    }
}

/// Build an [`Args`] list from expressions convertible into JSON values.
///
/// ```
/// use lazycache_core::args;
///
/// let args = args![0, 6, "Model"];
/// assert_eq!(args.len(), 3);
/// assert_eq!(args.get::<u32>(1).unwrap(), 6);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Args::new()$(.with($value))+
    };
}

/// A routine that computes the items of one cache entry.
pub trait Producer<T>: Send + 'static {
    /// Declared parameters, used to validate bound arguments.
    fn signature(&self) -> Signature;

    /// Compute the items. `args` always has `signature().total()` entries
    /// once optional defaults are filled in.
    fn produce(&self, args: &Args) -> Result<Vec<T>, ProducerError>;
}

/// Adapter turning a signature and a closure into a [`Producer`].
pub struct FnProducer<F> {
    signature: Signature,
    func: F,
}

impl<F> FnProducer<F> {
    pub fn new(signature: Signature, func: F) -> Self {
        Self { signature, func }
    }
}

impl<T, F> Producer<T> for FnProducer<F>
where
    F: Fn(&Args) -> Result<Vec<T>, ProducerError> + Send + 'static,
{
    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    fn produce(&self, args: &Args) -> Result<Vec<T>, ProducerError> {
        (self.func)(args)
    }
}

type ProduceFn<T> = Box<dyn FnOnce() -> Result<Vec<T>, ProducerError> + Send>;

/// A producer with all of its arguments bound; invoked at most once.
pub struct BoundProducer<T> {
    name: &'static str,
    run: ProduceFn<T>,
}

impl<T: 'static> BoundProducer<T> {
    /// Validate `args` against the producer's signature and bind them.
    pub fn bind<P>(producer: P, args: Args) -> CacheResult<Self>
    where
        P: Producer<T>,
    {
        let signature = producer.signature();
        signature.check(args.len())?;
        let args = signature.complete(args);
        Ok(Self {
            name: signature.name(),
            run: Box::new(move || producer.produce(&args)),
        })
    }

    /// Wrap a closure that already captured everything it needs.
    pub fn from_fn<F>(name: &'static str, func: F) -> Self
    where
        F: FnOnce() -> Result<Vec<T>, ProducerError> + Send + 'static,
    {
        Self {
            name,
            run: Box::new(func),
        }
    }
}

impl<T> BoundProducer<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the producer, consuming it.
    pub fn produce(self) -> Result<Vec<T>, ProducerError> {
        (self.run)()
    }
}

impl<T> std::fmt::Debug for BoundProducer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundProducer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
