/// Which of its two homes every particle is heading toward.
///
/// The state itself is discrete; the motion between homes is continuous and
/// owned by the animators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimationState {
    /// Particles gather into the tree.
    #[default]
    Tree,
    /// Particles scatter into the burst cloud.
    Explode,
}

impl AnimationState {
    /// The other state.
    pub fn toggled(self) -> Self {
        match self {
            Self::Tree => Self::Explode,
            Self::Explode => Self::Tree,
        }
    }

    /// Flip in place, returning the new state.
    pub fn toggle(&mut self) -> Self {
        *self = self.toggled();
        *self
    }

    /// Pick the value that belongs to this state.
    #[inline]
    pub fn select<T>(self, tree: T, explode: T) -> T {
        match self {
            Self::Tree => tree,
            Self::Explode => explode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_assembled() {
        assert_eq!(AnimationState::default(), AnimationState::Tree);
    }

    #[test]
    fn double_toggle_round_trips() {
        let mut state = AnimationState::Tree;
        assert_eq!(state.toggle(), AnimationState::Explode);
        assert_eq!(state.toggle(), AnimationState::Tree);
        assert_eq!(state.select("tree", "burst"), "tree");
    }

    #[test]
    fn select_follows_state() {
        assert_eq!(AnimationState::Explode.select(1, 2), 2);
        assert_eq!(AnimationState::Tree.toggled(), AnimationState::Explode);
    }
}
