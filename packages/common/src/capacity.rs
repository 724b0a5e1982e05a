/// Snapshot of an event's capacity against its live registration count.
///
/// `occupied` counts active registrations only (see
/// [`RegistrationStatus::is_active`](crate::RegistrationStatus::is_active)).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occupancy {
    pub capacity: i32,
    pub occupied: u64,
}

impl Occupancy {
    pub fn new(capacity: i32, occupied: u64) -> Self {
        Self { capacity, occupied }
    }

    /// Places still free. Clamped at zero when capacity was lowered below
    /// the current occupancy.
    pub fn available(&self) -> u64 {
        let capacity = u64::try_from(self.capacity).unwrap_or(0);
        capacity.saturating_sub(self.occupied)
    }

    /// Whether one more active registration may be admitted.
    pub fn has_room(&self) -> bool {
        self.available() > 0
    }
}
