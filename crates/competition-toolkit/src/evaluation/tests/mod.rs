mod common;
mod hhi;
mod merger;
