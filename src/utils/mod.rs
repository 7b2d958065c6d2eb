pub mod time;

/// Generate a 21 character id.
pub fn longid() -> String {
    nanoid::nanoid!()
}

