pub mod dmp;
