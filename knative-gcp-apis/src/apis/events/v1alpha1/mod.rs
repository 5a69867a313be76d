mod cloudstoragesource;

pub use cloudstoragesource::*;
