#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Status {
    #[default]
    Idle,
    AwaitingReceive,
    Delivered,
}

pub(crate) struct State<T> {
    pub(crate) status: Status,
    pub(crate) slot: Option<T>,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            slot: None,
        }
    }
}

impl<T> State<T> {
    pub(crate) fn deliver(&mut self, value: T) {
        assert_eq!(self.status, Status::AwaitingReceive, "no receiver waiting");
        self.slot = Some(value);
        self.status = Status::Delivered;
    }

    pub(crate) fn take(&mut self) -> Option<T> {
        let value = match self.status {
            Status::Delivered => self.slot.take(),
            _ => None,
        };
        self.status = Status::Idle;
        self.slot = None;
        value
    }
}
