use std::fmt;

use urtx_protocol::Descriptor;

/// A subscription key on a transport's event bus.
///
/// Every decoded package is published twice: once on
/// [`Topic::AnyPackage`] and once on the topic of its own descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Catch-all: every package, whatever its descriptor.
    AnyPackage,
    /// Only packages with this descriptor.
    Descriptor(Descriptor),
}

impl From<Descriptor> for Topic {
    fn from(descriptor: Descriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyPackage => f.write_str("any-package"),
            Self::Descriptor(d) => write!(f, "{d}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_display() {
        assert_eq!(Topic::AnyPackage.to_string(), "any-package");
        assert_eq!(Topic::Descriptor(Descriptor(1)).to_string(), "1");
    }

    #[test]
    fn test_topic_from_descriptor() {
        assert_eq!(Topic::from(Descriptor(3)), Topic::Descriptor(Descriptor(3)));
        assert_ne!(Topic::from(Descriptor(0)), Topic::AnyPackage);
    }
}
