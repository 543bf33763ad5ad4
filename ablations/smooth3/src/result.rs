//! 实验结果.

use crate::algos::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Completed runs: {}", p.get_completed())?;
    writeln!(w, "{S4}Cancelled runs: {}", p.get_cancelled())?;
    writeln!(w, "{S4}Failed runs: {}", p.get_failed())?;
    writeln!(w, "{S4}Engine time: {:.3} ms", p.get_run_time_ms())?;
    writeln!(
        w,
        "{S4}Average engine time: {} ms",
        f64_to_display(p.get_avg_run_time_ms())
    )?;
    writeln!(w, "{S4}Total machine time: {:.3} ms", p.get_real_time_ms())?;
    writeln!(w, "{S4}Output noise RMS: {}", f64_to_display(p.get_output_rms()))?;
    writeln!(
        w,
        "{S4}Max separable/full deviation: {}",
        f64_to_display(p.get_max_deviation())
    )?;
    let t = p
        .get_most_time_consuming()
        .map(|d| d.as_secs_f64() * 1e3);
    write!(w, "{S4}Slowest run costs {} ms", f64_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut buf).unwrap();
            println!("{}", std::str::from_utf8(&buf).unwrap());
            buf.clear();

            utils::sep();
        }
    }
}
