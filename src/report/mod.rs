pub mod html;
pub mod summary_txt;
pub mod text;
pub mod zip;
