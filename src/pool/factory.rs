//! Resource factory abstraction.

use crate::pool::error::BoxError;

/// Produces a live resource (typically a connection) on demand.
///
/// The pool never inspects or releases the resource; ownership passes to the
/// caller of `acquire`.
pub trait ResourceFactory<R>: Send + Sync {
    fn create(&self) -> Result<R, BoxError>;
}

impl<F, R, E> ResourceFactory<R> for F
where
    F: Fn() -> Result<R, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn create(&self) -> Result<R, BoxError> {
        self().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_factory() {
        let ok = || Ok::<_, std::io::Error>(7u32);
        assert_eq!(ok.create().unwrap(), 7);

        let err = || Err::<u32, _>("down");
        assert_eq!(err.create().unwrap_err().to_string(), "down");
    }
}
