//! Sample roster offered for download next to the upload form.

pub const SAMPLE_FILENAME: &str = "SLS_Sample.csv";

pub const SAMPLE_CSV: &str = "Name,Lodge,Role\n\
Cortland Bolles,Wewikit Lodge,Staff\n\
Christopher Grove,Tipisa Lodge,Participant\n\
Brea Baygents,Wewikit Lodge,Participant\n\
Donathan Linebrink,Shenandoah Lodge,Staff\n";
