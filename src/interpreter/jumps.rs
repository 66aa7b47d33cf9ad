//! `JUMP`, `JUMPT`, `JUMPF`

use crate::interpreter::engine::{Effect, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::instruction::Operand;

impl Interpreter {
    pub(crate) fn exec_jump(&self, target: &Operand) -> Result<Effect, RuntimeError> {
        Ok(Effect::Jump(label_target(target)?))
    }

    /// `JUMPT` (`when = true`) and `JUMPF` (`when = false`). The condition
    /// must be a Boolean.
    pub(crate) fn exec_conditional_jump(
        &self,
        condition: &Operand,
        target: &Operand,
        when: bool,
    ) -> Result<Effect, RuntimeError> {
        let value = self.value_of(condition)?;
        let Value::Boolean(taken) = value else {
            return Err(RuntimeError::type_mismatch("Boolean", &value));
        };
        if taken == when {
            Ok(Effect::Jump(label_target(target)?))
        } else {
            Ok(Effect::Next)
        }
    }
}

fn label_target(operand: &Operand) -> Result<usize, RuntimeError> {
    match operand {
        Operand::Label(label) => Ok(label.target),
        other => Err(RuntimeError::TypeMismatch {
            expected: "a label".to_string(),
            found: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::VmConfig;
    use crate::interpreter::engine::Interpreter;
    use crate::parser::load_program;
    use crate::sink::Console;

    fn output(src: &str) -> Vec<String> {
        let (sink, mut console) = Console::attach();
        let mut interp = Interpreter::new(load_program(src).unwrap(), sink, VmConfig::default());
        interp.run().unwrap();
        console.drain();
        console.output_lines().into_iter().map(String::from).collect()
    }

    #[test]
    fn conditional_jumps_follow_the_condition() {
        let src = "\
JUMPT true, a
PRINT \"not here\"
a:
JUMPF true, b
PRINT \"fell through\"
JUMPF false, b
PRINT \"not here either\"
b:
";
        assert_eq!(output(src), vec!["fell through"]);
    }

    #[test]
    fn counting_loop() {
        let src = "\
ASSIGN i, 0
top:
GE done, i, 3
JUMPT done, end
PRINT i
ADD i, i, 1
JUMP top
end:
";
        assert_eq!(output(src), vec!["0", "1", "2"]);
    }

    #[test]
    fn non_boolean_condition_is_a_type_mismatch() {
        let mut interp = Interpreter::new(
            load_program("JUMPT 1, x\nx:").unwrap(),
            crate::sink::Sink::discard(),
            VmConfig::default(),
        );
        assert_eq!(interp.run().unwrap_err().kind, "TypeMismatch");
    }
}
