pub mod daily_record;
pub mod location;
pub mod ordinal_date;
