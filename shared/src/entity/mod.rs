pub mod user_memories;
pub mod user_profiles;
