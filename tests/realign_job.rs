use std::path::Path;

use pretty_assertions::assert_eq;
use spmbatch::{JobValue, Realign, SpmResult, VolumeSource};

struct FourD(u64);

impl VolumeSource for FourD {
    fn shape(&self, _path: &Path) -> SpmResult<Vec<u64>> {
        Ok(vec![64, 64, 30, self.0])
    }
}

#[test]
fn realign_job_matches_engine_script_exactly() {
    let mut op = Realign::new();
    op.options.set("infile", "bold.nii");
    op.options.set("fwhm", 5.0);
    op.options.set("separation", 4.0);
    op.options.set("register_to_mean", true);
    op.options.set("wrap", vec![0i64, 0, 1]);

    let job = op.compile(&FourD(2)).unwrap();
    assert_eq!(
        job.to_mfile(),
        "% generated by spmbatch\n\
         spm_defaults;\n\
         \n\
         jobs{1}.spatial{1}.realign{1}.estwrite.data = {...\n\
         'bold.nii,1';...\n\
         'bold.nii,2';...\n\
         };\n\
         jobs{1}.spatial{1}.realign{1}.estwrite.eoptions.fwhm = 5;\n\
         jobs{1}.spatial{1}.realign{1}.estwrite.eoptions.sep = 4;\n\
         jobs{1}.spatial{1}.realign{1}.estwrite.eoptions.rtm = 1;\n\
         jobs{1}.spatial{1}.realign{1}.estwrite.eoptions.wrap(1) = 0;\n\
         jobs{1}.spatial{1}.realign{1}.estwrite.eoptions.wrap(2) = 0;\n\
         jobs{1}.spatial{1}.realign{1}.estwrite.eoptions.wrap(3) = 1;\n\
         spm_jobman('run',jobs);"
    );
}

#[test]
fn options_order_follows_the_schema_not_assignment_order() {
    // Assign in reverse; the emitted estimation options still come out in
    // schema order.
    let mut op = Realign::new();
    op.options.set("wrap", vec![0i64, 0, 0]);
    op.options.set("separation", 4.0);
    op.options.set("fwhm", 5.0);
    op.options.set("infile", "bold.nii");

    let job = op.compile(&FourD(1)).unwrap();
    let JobValue::Fields(fields) = job
        .instance
        .field("estwrite")
        .unwrap()
        .field("eoptions")
        .unwrap()
        .clone()
    else {
        panic!("eoptions must be a keyed group");
    };
    let keys: Vec<String> = fields.into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["fwhm", "sep", "wrap"]);
}

#[test]
fn sessions_nest_as_indexed_file_lists() {
    let mut op = Realign::new();
    op.options
        .set("infile", vec!["s1.nii".to_string(), "s2.nii".to_string()]);
    let job = op.compile(&FourD(2)).unwrap();
    let text = job.to_mfile();
    assert!(text.contains("estwrite.data(1) = {...\n's1.nii,1';..."));
    assert!(text.contains("estwrite.data(2) = {...\n's2.nii,1';..."));
}

#[test]
fn structured_document_round_trips_through_json() {
    let mut op = Realign::new();
    op.options.set("infile", "bold.nii");
    op.options.set("quality", 0.9);
    let job = op.compile(&FourD(1)).unwrap();

    let json = serde_json::to_value(job.to_jobs_document()).unwrap();
    let quality = &json["jobs"][0]["spatial"][0]["realign"][0]["estwrite"]["eoptions"]["quality"];
    assert_eq!(quality.as_f64(), Some(0.9));
}
