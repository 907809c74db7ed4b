//! Integration tests: the full scan→size→execute loop against an
//! in-memory venue.

mod mock_gateway;
mod trading_cycle;
