pub const HARTREE_TO_EV:      f64 = 27.211386245988;    // eV/Hartree, CODATA 2018
pub const BOHR_TO_ANGSTROM:   f64 = 0.529177210903;     // Angstrom/Bohr, CODATA 2018
pub const FORCE_AU_TO_EV_PER_ANGSTROM: f64 = HARTREE_TO_EV / BOHR_TO_ANGSTROM;   // Hartree/Bohr => eV/Angstrom
pub const TIME_TOLERANCE_FS:  f64 = 1e-3;     // .ener prints time with 6 decimals
