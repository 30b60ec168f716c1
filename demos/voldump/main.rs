//! An application for listing the volumes behind a file name or locator.

extern crate volread;

use std::env;
use volread::{read_volumes, VolumeUrl};

fn main() {
    let mut args = env::args().skip(1);
    let locator = args.next().expect("Path or locator of a volume is required");
    let batch = read_volumes(VolumeUrl::parse(&locator)).expect("Failed to read volume");
    for volume in &batch {
        println!(
            "{:?} {} spacing {:?} modality {} step {}",
            volume.dim(),
            volume.buffer().voxel_type(),
            volume.spacing(),
            volume.modality(),
            volume.time_step(),
        );
        println!("  {}", volume.origin());
    }
}
