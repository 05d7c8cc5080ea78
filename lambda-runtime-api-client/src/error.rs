/// A type-erased error. Used throughout the client because the concrete
/// failures here (malformed URIs, transport failures, channel closures) have
/// nothing in common beyond implementing [`std::error::Error`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Alias kept distinct from [`BoxError`] at the call sites that construct
/// errors rather than propagate them, matching how the rest of the crate
/// spells it.
pub type Error = BoxError;
