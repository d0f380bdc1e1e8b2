pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod scan;
pub mod schedule;
pub mod timer;
pub mod processing {
    pub mod blur;
    pub mod layout;
}
pub mod render {
    pub mod backdrop;
    pub mod surface;
    pub mod transition;
}
pub mod tasks {
    pub mod pacer;
    pub mod player;
}
