//! Overlay bookkeeping: which panels are open and in what order.
//!
//! Stacking is derived from open order. The first open modal sits at
//! [`BASE_Z_INDEX`], each later one a tier above, so any number of modals has a
//! well-defined order. Escape pops the top of the stack.

pub const BASE_Z_INDEX: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModalId {
    History,
    Settings,
}

impl ModalId {
    pub fn class_name(self) -> &'static str {
        match self {
            ModalId::History => "history",
            ModalId::Settings => "settings",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ModalId::History => "Revision History",
            ModalId::Settings => "Settings",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalStack<Id = ModalId> {
    open: Vec<Id>,
    closes_on_background: bool,
}

impl<Id> Default for ModalStack<Id> {
    fn default() -> Self {
        Self {
            open: Vec::new(),
            closes_on_background: false,
        }
    }
}

impl<Id: Copy + PartialEq> ModalStack<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when `id` was already open; its tier is kept.
    pub fn open(&mut self, id: Id) -> bool {
        // The background handler is installed on first use and never removed.
        self.closes_on_background = true;
        if self.is_open(id) {
            return false;
        }
        self.open.push(id);
        true
    }

    pub fn close(&mut self, id: Id) -> bool {
        match self.open.iter().position(|open| *open == id) {
            Some(index) => {
                self.open.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn close_many(&mut self, ids: &[Id]) -> usize {
        ids.iter().filter(|id| self.close(**id)).count()
    }

    pub fn close_all(&mut self) -> Vec<Id> {
        let open = self.open.clone();
        self.close_many(&open);
        open
    }

    pub fn close_top(&mut self) -> Option<Id> {
        self.open.pop()
    }

    pub fn is_open(&self, id: Id) -> bool {
        self.open.contains(&id)
    }

    pub fn active(&self) -> &[Id] {
        &self.open
    }

    pub fn z_index(&self, id: Id) -> Option<u32> {
        self.open
            .iter()
            .position(|open| *open == id)
            .map(|position| BASE_Z_INDEX + position as u32)
    }

    /// The background is blurred while anything is open.
    pub fn is_blurred(&self) -> bool {
        !self.open.is_empty()
    }

    pub fn closes_on_background(&self) -> bool {
        self.closes_on_background
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_open_order() {
        let mut stack = ModalStack::new();
        assert!(stack.open(ModalId::Settings));
        assert!(stack.open(ModalId::History));

        assert_eq!(stack.z_index(ModalId::Settings), Some(2));
        assert_eq!(stack.z_index(ModalId::History), Some(3));
        assert!(stack.is_blurred());
    }

    #[test]
    fn reopening_is_a_no_op() {
        let mut stack = ModalStack::new();
        stack.open(ModalId::History);
        stack.open(ModalId::Settings);
        assert!(!stack.open(ModalId::History));

        assert_eq!(stack.active(), &[ModalId::History, ModalId::Settings]);
        assert_eq!(stack.z_index(ModalId::History), Some(2));
    }

    #[test]
    fn escape_closes_most_recent_first() {
        let mut stack = ModalStack::new();
        stack.open(ModalId::History);
        stack.open(ModalId::Settings);

        assert_eq!(stack.close_top(), Some(ModalId::Settings));
        assert!(stack.is_open(ModalId::History));
        assert_eq!(stack.close_top(), Some(ModalId::History));
        assert_eq!(stack.close_top(), None);
        assert!(!stack.is_blurred());
    }

    #[test]
    fn closing_lower_modal_drops_the_upper_one_a_tier() {
        let mut stack = ModalStack::new();
        stack.open(ModalId::History);
        stack.open(ModalId::Settings);
        assert!(stack.close(ModalId::History));
        assert!(!stack.close(ModalId::History));

        assert_eq!(stack.z_index(ModalId::Settings), Some(BASE_Z_INDEX));
        assert_eq!(stack.z_index(ModalId::History), None);
    }

    #[test]
    fn third_modal_stacks_above_the_others() {
        let mut stack: ModalStack<u8> = ModalStack::new();
        stack.open(1);
        stack.open(2);
        assert!(stack.open(3));

        assert_eq!(stack.active(), &[1, 2, 3]);
        assert_eq!(stack.z_index(3), Some(BASE_Z_INDEX + 2));
        assert_eq!(stack.close_top(), Some(3));
        assert_eq!(stack.active(), &[1, 2]);
    }

    #[test]
    fn closing_a_set_and_background_close() {
        let mut stack = ModalStack::new();
        assert!(!stack.closes_on_background());
        stack.open(ModalId::History);
        stack.open(ModalId::Settings);
        assert!(stack.closes_on_background());

        assert_eq!(stack.close_many(&[ModalId::Settings, ModalId::Settings]), 1);
        assert_eq!(stack.close_all(), vec![ModalId::History]);
        assert!(!stack.is_blurred());
        assert!(stack.closes_on_background());
    }
}
