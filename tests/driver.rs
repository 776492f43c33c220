use bvm::{fingerprint, Driver, Summary, Word};

/// Runs `input` through a driver and returns the output lines, sorted.
fn run_lines(driver: &Driver, input: &str, threads: usize) -> (Summary, Vec<String>) {
  let mut output: Vec<u8> = vec![];
  let summary = driver.run(input.as_bytes(), &mut output, threads).unwrap();
  let text = String::from_utf8(output).unwrap();
  let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
  lines.sort();
  (summary, lines)
}

#[test]
fn one_input_prints_the_output_itself() {
  let driver = Driver::new(vec![vec![5]]).unwrap();
  let (summary, lines) = run_lines(&driver, "(lambda (x) (plus x 1))\n", 1);
  assert_eq!(summary, Summary { compiled: 1, rejected: 0 });
  assert_eq!(lines, vec!["6\t(lambda (x) (plus x 1))".to_string()]);
}

#[test]
fn several_inputs_print_the_combined_fingerprint() {
  let driver = Driver::new(vec![vec![1], vec![2], vec![3]]).unwrap();
  let (_, lines) = run_lines(&driver, "(lambda (x) (shl1 x))", 2);
  let expected = format!("{}\t(lambda (x) (shl1 x))", fingerprint(&[2, 4, 6]));
  assert_eq!(lines, vec![expected]);
}

#[test]
fn tuples_fill_several_slots() {
  let driver = Driver::new(vec![vec![0x10, 0x01]]).unwrap();
  let (_, lines) = run_lines(&driver, "(lambda (x y) (or x y))", 1);
  assert_eq!(lines, vec!["17\t(lambda (x y) (or x y))".to_string()]);
}

#[test]
fn line_prefixes_and_blank_lines_are_ignored() {
  let driver = Driver::new(vec![vec![0]]).unwrap();
  let input = "\n\
               id 17 (lambda (x) (not x))   \t\n\
               no program on this line\n\
               \n\
               (lambda (x) (if0 x 1 2))\n";
  let (summary, lines) = run_lines(&driver, input, 3);
  assert_eq!(summary, Summary { compiled: 2, rejected: 0 });
  assert_eq!(
    lines,
    vec![
      "1\t(lambda (x) (if0 x 1 2))".to_string(),
      format!("{}\t(lambda (x) (not x))", !(0 as Word)),
    ]
  );
}

#[test]
fn rejected_programs_are_skipped() {
  let driver = Driver::new(vec![vec![3]]).unwrap();
  let input = "(lambda (x) (frob x))\n(lambda (x) x)\n(lambda (x) x) x\n";
  let (summary, lines) = run_lines(&driver, input, 2);
  assert_eq!(summary, Summary { compiled: 1, rejected: 2 });
  assert_eq!(lines, vec!["3\t(lambda (x) x)".to_string()]);
}

#[test]
fn every_program_gets_exactly_one_line() {
  let driver = Driver::new(vec![vec![7], vec![9]]).unwrap();
  let programs: Vec<String> = (0..200)
    .map(|i| format!("(lambda (x) (plus x {}))", i))
    .collect();
  let input = programs.join("\n");
  let (summary, lines) = run_lines(&driver, &input, 4);
  assert_eq!(summary.compiled, 200);
  assert_eq!(lines.len(), 200);

  let mut expected: Vec<String> = (0..200)
    .map(|i: Word| format!("{}\t(lambda (x) (plus x {}))", fingerprint(&[7 + i, 9 + i]), i))
    .collect();
  expected.sort();
  assert_eq!(lines, expected);
}

#[test]
fn disassembly_lists_the_bytecode() {
  let driver = Driver::new(vec![vec![0]]).unwrap().with_disassembly(true);
  let mut output: Vec<u8> = vec![];
  driver.run("(lambda (x) (if0 x 1 2))".as_bytes(), &mut output, 1).unwrap();
  let text = String::from_utf8(output).unwrap();
  assert!(text.starts_with("(lambda (x) (if0 x 1 2))\n"));
  assert!(text.contains("load_arg 0"));
  assert!(text.contains("jnz +4"));
  assert!(text.contains("jmp +1"));
}

#[test]
fn lines_that_are_not_utf8_are_skipped() {
  let driver = Driver::new(vec![vec![5]]).unwrap();
  let input: &[u8] = b"(lambda (x) x)\n(lambda (x) \xff)\n(lambda (x) (not x))\n";
  let mut output: Vec<u8> = vec![];
  let summary = driver.run(input, &mut output, 2).unwrap();
  assert_eq!(summary, Summary { compiled: 2, rejected: 1 });

  let text = String::from_utf8(output).unwrap();
  let mut lines: Vec<&str> = text.lines().collect();
  lines.sort();
  let negated = format!("{}\t(lambda (x) (not x))", !(5 as Word));
  assert_eq!(lines, vec![negated.as_str(), "5\t(lambda (x) x)"]);
}

#[test]
fn deeply_nested_programs_are_rejected_without_ending_the_run() {
  let driver = Driver::new(vec![vec![1]]).unwrap();
  let depth = 5000;
  let deep = format!("(lambda (x) {}x{})", "(not ".repeat(depth), ")".repeat(depth));
  let input = format!("{}\n(lambda (x) (shl1 x))\n", deep);
  let (summary, lines) = run_lines(&driver, &input, 2);
  assert_eq!(summary, Summary { compiled: 1, rejected: 1 });
  assert_eq!(lines, vec!["2\t(lambda (x) (shl1 x))".to_string()]);
}
