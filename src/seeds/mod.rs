pub mod roster_seed;
