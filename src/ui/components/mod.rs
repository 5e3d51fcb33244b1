pub mod chat;
pub mod kids_card;
pub mod menu;
pub mod shadowing_list;
pub mod star_meter;
