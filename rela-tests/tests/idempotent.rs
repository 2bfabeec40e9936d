use rela_plan::{optimize_algebra_plan, OptimizeOptions};
use rela_tests::*;

#[test]
fn test_rerun_is_stable() {
    for Case {
        name,
        mut dag,
        root,
        ..
    } in regression_corpus()
    {
        let root = optimize_algebra_plan(&mut dag, root).unwrap();
        let shape = dag.shape(root);
        let plan = explain(&dag, root);
        let (rerun, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
        assert_eq!(root, rerun, "{}", name);
        assert!(stats.fired.is_empty(), "{} fired {:?}", name, stats.fired);
        assert_eq!(shape, dag.shape(rerun), "{}", name);
        assert_eq!(plan, explain(&dag, rerun), "{}", name);
    }
}
