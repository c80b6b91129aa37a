//! Surface identifiers for the two output pipelines

/// One of the two independent rendering/output targets.
///
/// Every output handler is tagged with its surface at creation time, and
/// every event it emits carries the tag back, so nothing ever has to compare
/// handler identities to work out which pipeline reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Primary (horizontal) output
    Horizontal,
    /// Secondary (vertical) output
    Vertical,
}

impl Surface {
    /// Both surfaces, in aggregate-evaluation order.
    pub const ALL: [Surface; 2] = [Surface::Horizontal, Surface::Vertical];
}

/// Which surface(s) a stop request applies to.
///
/// `All` means "whichever surfaces are active". It is a command parameter
/// only and is never stored as state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTarget {
    Horizontal,
    Vertical,
    All,
}

impl StopTarget {
    /// Whether this target covers the given surface.
    pub fn includes(self, surface: Surface) -> bool {
        match self {
            StopTarget::Horizontal => surface == Surface::Horizontal,
            StopTarget::Vertical => surface == Surface::Vertical,
            StopTarget::All => true,
        }
    }
}

/// A pair of values indexed by [`Surface`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerSurface<T> {
    pub horizontal: T,
    pub vertical: T,
}

impl<T> PerSurface<T> {
    pub fn get(&self, surface: Surface) -> &T {
        match surface {
            Surface::Horizontal => &self.horizontal,
            Surface::Vertical => &self.vertical,
        }
    }

    pub fn get_mut(&mut self, surface: Surface) -> &mut T {
        match surface {
            Surface::Horizontal => &mut self.horizontal,
            Surface::Vertical => &mut self.vertical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_target_includes() {
        assert!(StopTarget::All.includes(Surface::Horizontal));
        assert!(StopTarget::All.includes(Surface::Vertical));
        assert!(StopTarget::Horizontal.includes(Surface::Horizontal));
        assert!(!StopTarget::Horizontal.includes(Surface::Vertical));
        assert!(StopTarget::Vertical.includes(Surface::Vertical));
        assert!(!StopTarget::Vertical.includes(Surface::Horizontal));
    }

    #[test]
    fn test_per_surface_indexing() {
        let mut pair = PerSurface {
            horizontal: 1,
            vertical: 2,
        };
        assert_eq!(*pair.get(Surface::Horizontal), 1);
        assert_eq!(*pair.get(Surface::Vertical), 2);
        *pair.get_mut(Surface::Vertical) = 7;
        assert_eq!(*pair.get(Surface::Vertical), 7);
    }
}
