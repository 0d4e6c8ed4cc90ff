pub mod room_token;
pub mod test_utils;
