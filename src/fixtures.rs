#[cfg(test)]
pub mod test {
    use crate::schema::Value;
    use crate::sync::Updates;

    /// A hand-edited Makefile: usage comments that mention every key, the
    /// assignment block, and rules that reference the variables.
    pub const SAMPLE_MAKEFILE: &str = "\
# Usage:
# DEVICE = <Device_Name>   # e.g. PFS154
# F_CPU  = <Frequency>

DEVICE = PFS154
ARCH = pdk14
PROJECT_NAME = Blinky
F_CPU = 8000000
TARGET_VDD_MV = 5000
TARGET_VDD = 5.0
OPT_FLAGS = --opt-code-size --fverbose-asm

OUTPUT_NAME = $(PROJECT_NAME)_$(DEVICE)
COMPILE = sdcc -m$(ARCH) -c $(OPT_FLAGS) -D$(DEVICE) -DF_CPU=$(F_CPU)

build:
\t$(COMPILE) -o build/main.rel main.c

run:
\teasypdkprog -r $(TARGET_VDD) start
";

    /// The stock defaults, spelled out without going through confique.
    pub fn makefile_defaults() -> Updates {
        Updates::new()
            .set("DEVICE", "PFS154")
            .set("ARCH", "pdk14")
            .set("PROJECT_NAME", "MyProject")
            .set("F_CPU", 8_000_000u64)
            .set("TARGET_VDD_MV", 5000u64)
            .set("TARGET_VDD", 5.0)
            .set("OPT_FLAGS", Value::Text("--opt-code-size".into()))
    }
}
