use std::ops::{
    Deref,
    DerefMut,
};
use super::*;

impl From<Vec<State>> for States {
    fn from(args: Vec<State>) -> Self {
        Self(args)
    }
}

impl<const N: usize> From<[State; N]> for States {
    fn from(args: [State; N]) -> Self {
        Self(args.into())
    }
}

impl Deref for States {
    type Target = Vec<State>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for States {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl IntoIterator for States {
    type Item = State;
    type IntoIter = std::vec::IntoIter<State>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl States {
    pub fn by_label(&self, label: &str) -> Option<&State> {
        self.0.iter().find(|s| s.label == label)
    }
}
