mod abort;
mod common;
mod dispense_cycle;
mod startup;
